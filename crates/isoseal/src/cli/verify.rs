use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use isoseal_core::worker::{JobEvent, spawn_verification};
use isoseal_core::{Engine, EngineConfig};

use super::{BackendArg, Verdict};

#[derive(Args, Clone, Debug)]
pub struct VerifyArg {
    /// Disk image to check.
    pub iso: PathBuf,

    /// Detached signature file.
    pub signature: PathBuf,

    #[command(flatten)]
    pub backend: BackendArg,
}

pub fn run(arg: VerifyArg, mut config: EngineConfig) -> Result<Verdict> {
    arg.backend.apply(&mut config)?;
    let engine = Arc::new(Engine::from_config(config));
    let handle = spawn_verification(engine, arg.iso.clone(), arg.signature.clone())?;

    let mut finished = None;
    for event in handle.events().iter() {
        match event {
            JobEvent::Log(line) => println!("{line}"),
            JobEvent::Progress(_) => {}
            JobEvent::Finished(result) => finished = Some(result),
        }
    }

    let authentic = finished
        .context("Verification job ended without a result")?
        .with_context(|| format!("Failed to verify {}", arg.iso.display()))?;

    if authentic {
        println!("{}", style("AUTHENTIC").green().bold());
        Ok(Verdict::Success)
    } else {
        println!("{}", style("NOT AUTHENTIC").red().bold());
        Ok(Verdict::NotAuthentic)
    }
}
