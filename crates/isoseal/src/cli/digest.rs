use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use isoseal_core::{AlgorithmSet, CancellationToken, EngineConfig};
use isoseal_digest::DigestAlgorithm;

use super::{Verdict, parse_algorithm};
use crate::ui::tracker::ProgressTrackerBuilder;

#[derive(Args, Clone, Debug)]
pub struct DigestArg {
    /// File to hash.
    pub iso: PathBuf,

    #[arg(short = 'a', long = "algorithm", value_name = "ALG", value_parser = parse_algorithm,
          help = "Digest algorithm, repeatable (default from config)")]
    pub algorithms: Vec<DigestAlgorithm>,
}

/// Print checksums in coreutils style: plain `*sum` lines for a single
/// algorithm, BSD tagged lines (`SHA256 (name) = hex`) for several.
pub fn run(arg: DigestArg, config: EngineConfig) -> Result<Verdict> {
    let algorithms = if arg.algorithms.is_empty() {
        config.algorithms()?
    } else {
        AlgorithmSet::new(arg.algorithms)?
    };
    let name = arg
        .iso
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Image path has no file name")?;

    let tracker = ProgressTrackerBuilder::default().with_prefix("Hashing").build();
    let progress = |percent: u8| tracker.set(percent);
    let output = config
        .digest_engine()
        .digest(&arg.iso, &algorithms, &progress, &CancellationToken::new());
    let output = match output {
        Ok(output) => {
            tracker.finish();
            output
        }
        Err(e) => {
            tracker.abandon();
            return Err(e).with_context(|| format!("Failed to hash {}", arg.iso.display()));
        }
    };

    if output.result.len() == 1 {
        for algorithm in output.result.algorithms() {
            if let Some(line) = output.result.checksum_line(algorithm, &name) {
                print!("{line}");
            }
        }
    } else {
        for (algorithm, hex) in output.result.iter() {
            println!("{} ({name}) = {hex}", algorithm.label());
        }
    }
    Ok(Verdict::Success)
}
