use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use isoseal_digest::{AlgorithmSet, DEFAULT_CHUNK_SIZE, DigestAlgorithm, DigestEngine};
use isoseal_sign::{GpgBackend, KeyringBackend, SignatureManager};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{EngineError, Result};

pub const CONFIG_ENV: &str = "ISOSEAL_CONFIG";

/// Engine settings, usually read from `~/.config/isoseal/config.toml`.
///
/// ```toml
/// output_root = "/srv/releases"
/// default_algorithms = ["sha256", "sha512"]
/// identity = "release@example.org"
///
/// [backend]
/// kind = "keyring"
/// dir = "/etc/isoseal/keys"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub chunk_size:         usize,
    pub parallel_digest:    bool,
    pub default_algorithms: Vec<DigestAlgorithm>,
    pub output_root:        PathBuf,
    pub identity:           Option<String>,
    pub backend:            BackendConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size:         DEFAULT_CHUNK_SIZE,
            parallel_digest:    false,
            default_algorithms: vec![DigestAlgorithm::Sha256],
            output_root:        PathBuf::from("release"),
            identity:           None,
            backend:            BackendConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum BackendConfig {
    Gpg {
        #[serde(default = "default_gpg")]
        program: String,
        #[serde(default)]
        homedir: Option<PathBuf>,
    },
    Keyring {
        dir: PathBuf,
    },
}

fn default_gpg() -> String { "gpg".to_string() }

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Gpg {
            program: default_gpg(),
            homedir: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| EngineError::ConfigParse {
            path:   origin.to_path_buf(),
            source: e,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::ConfigRead {
            path:   path.to_path_buf(),
            source: e,
        })?;
        debug!(path = %path.display(), "loaded config");
        Self::from_toml(&text, path)
    }

    /// `$ISOSEAL_CONFIG` if set, else `~/.config/isoseal/config.toml` if it
    /// exists, else defaults.
    pub fn discover() -> Result<Self> { Self::discover_from(env::var_os(CONFIG_ENV), home::home_dir()) }

    fn discover_from(explicit: Option<OsString>, home: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = explicit.filter(|p| !p.is_empty()) {
            return Self::load(PathBuf::from(path));
        }
        match home.map(|h| h.join(".config").join("isoseal").join("config.toml")) {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn algorithms(&self) -> Result<AlgorithmSet> {
        AlgorithmSet::new(self.default_algorithms.iter().copied()).map_err(|_| EngineError::NoAlgorithms)
    }

    pub fn digest_engine(&self) -> DigestEngine {
        DigestEngine::new()
            .chunk_size(self.chunk_size)
            .parallel(self.parallel_digest)
    }

    pub fn signature_manager(&self) -> SignatureManager {
        let manager = match &self.backend {
            BackendConfig::Gpg { program, homedir } => {
                let backend = GpgBackend::new().program(program.clone());
                match homedir {
                    Some(dir) => SignatureManager::new(backend.homedir(dir)),
                    None => SignatureManager::new(backend),
                }
            }
            BackendConfig::Keyring { dir } => SignatureManager::new(KeyringBackend::new(dir)),
        };
        match &self.identity {
            Some(identity) => manager.identity(identity.clone()),
            None => manager,
        }
    }
}
