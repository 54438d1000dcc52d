use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use isoseal_core::{BackendConfig, EngineConfig};
use isoseal_digest::DigestAlgorithm;
use std::path::PathBuf;
use tracing::debug;

use self::app::{App, Commands};

pub mod app;
mod digest;
mod keygen;
mod sign;
mod verify;

/// How a successful command ended, mapped to the exit status by `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Success,
    NotAuthentic,
}

pub fn run(app: App) -> Result<Verdict> {
    let config = load_config(app.config)?;
    match app.cmd {
        Commands::Sign(arg) => sign::run(arg, config),
        Commands::Verify(arg) => verify::run(arg, config),
        Commands::Digest(arg) => digest::run(arg, config),
        Commands::Keygen(arg) => keygen::run(arg),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    let config = match &path {
        Some(path) => EngineConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::discover().context("Failed to load config")?,
    };
    debug!(
        source = ?path,
        backend = ?config.backend,
        output_root = %config.output_root.display(),
        "config loaded"
    );
    Ok(config)
}

pub(crate) fn parse_algorithm(s: &str) -> Result<DigestAlgorithm, String> {
    s.parse().map_err(|_| {
        let known: Vec<_> = DigestAlgorithm::ALL.iter().map(|a| a.as_str()).collect();
        format!("unknown algorithm '{s}' (expected one of: {})", known.join(", "))
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Gpg,
    Keyring,
}

/// Signing backend selection shared by `sign` and `verify`.
#[derive(Args, Clone, Debug, Default)]
pub struct BackendArg {
    #[arg(long, value_enum, help = "Signing backend (default from config, else gpg)")]
    pub backend: Option<BackendKind>,

    #[arg(long, value_name = "DIR", help = "Keyring directory for the keyring backend")]
    pub keyring: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "GnuPG home directory")]
    pub gpg_homedir: Option<PathBuf>,
}

impl BackendArg {
    /// Fold command-line choices into `config.backend`.
    pub fn apply(&self, config: &mut EngineConfig) -> Result<()> {
        let kind = match (self.backend, &self.keyring) {
            (Some(kind), _) => kind,
            (None, Some(_)) => BackendKind::Keyring,
            (None, None) if self.gpg_homedir.is_some() => BackendKind::Gpg,
            (None, None) => return Ok(()),
        };

        config.backend = match kind {
            BackendKind::Keyring => {
                let dir = match (&self.keyring, &config.backend) {
                    (Some(dir), _) => dir.clone(),
                    (None, BackendConfig::Keyring { dir }) => dir.clone(),
                    (None, _) => bail!("--backend keyring needs --keyring DIR"),
                };
                BackendConfig::Keyring { dir }
            }
            BackendKind::Gpg => {
                let program = match &config.backend {
                    BackendConfig::Gpg { program, .. } => program.clone(),
                    BackendConfig::Keyring { .. } => "gpg".to_string(),
                };
                let homedir = match (&self.gpg_homedir, &config.backend) {
                    (Some(dir), _) => Some(dir.clone()),
                    (None, BackendConfig::Gpg { homedir, .. }) => homedir.clone(),
                    (None, _) => None,
                };
                BackendConfig::Gpg { program, homedir }
            }
        };
        Ok(())
    }
}
