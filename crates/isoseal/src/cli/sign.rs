use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use isoseal_core::worker::{JobEvent, spawn_signing};
use isoseal_core::{AlgorithmSet, Engine, EngineConfig, SigningRequest};
use isoseal_digest::DigestAlgorithm;

use super::{BackendArg, Verdict, parse_algorithm};
use crate::ui::tracker::ProgressTrackerBuilder;

#[derive(Args, Clone, Debug)]
pub struct SignArg {
    /// Disk image to sign.
    pub iso: PathBuf,

    #[arg(short, long, value_name = "DIR", help = "Output root; the bundle goes in DIR/<image stem>")]
    pub output: Option<PathBuf>,

    #[arg(short = 'a', long = "algorithm", value_name = "ALG", value_parser = parse_algorithm,
          help = "Digest algorithm, repeatable (default from config)")]
    pub algorithms: Vec<DigestAlgorithm>,

    #[arg(long, help = "Signing identity (key id, fingerprint or keyring name)")]
    pub identity: Option<String>,

    #[command(flatten)]
    pub backend: BackendArg,
}

pub fn run(arg: SignArg, mut config: EngineConfig) -> Result<Verdict> {
    arg.backend.apply(&mut config)?;
    if let Some(output) = arg.output {
        config.output_root = output;
    }
    if let Some(identity) = arg.identity {
        config.identity = Some(identity);
    }
    let algorithms = if arg.algorithms.is_empty() {
        config.algorithms()?
    } else {
        AlgorithmSet::new(arg.algorithms)?
    };

    let request = SigningRequest::new(&arg.iso, &config.output_root, algorithms);
    let engine = Arc::new(Engine::from_config(config));
    let handle = spawn_signing(engine, request)?;

    let tracker = ProgressTrackerBuilder::default()
        .with_prefix("Signing")
        .with_finish("done")
        .build();
    let mut finished = None;
    for event in handle.events().iter() {
        match event {
            JobEvent::Log(line) => tracker.println(&line),
            JobEvent::Progress(percent) => tracker.set(percent),
            JobEvent::Finished(result) => finished = Some(result),
        }
    }

    let outcome = match finished.context("Signing job ended without a result")? {
        Ok(outcome) => {
            tracker.finish();
            outcome
        }
        Err(e) => {
            tracker.abandon();
            return Err(e).with_context(|| format!("Failed to sign {}", arg.iso.display()));
        }
    };

    println!();
    print!("{}", outcome.report);
    println!("{} {}", style("Bundle:").green().bold(), outcome.destination.display());
    Ok(Verdict::Success)
}
