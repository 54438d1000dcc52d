use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use isoseal_digest::DigestResult;
use isoseal_sign::SignatureArtifact;
use serde::{Deserialize, Serialize};

/// Where the bundle's signature lives and who made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRef {
    pub file_name: String,
    pub identity:  String,
    pub backend:   String,
}

impl SignatureRef {
    pub fn from_artifact(artifact: &SignatureArtifact) -> Self {
        Self {
            file_name: artifact.file_name(),
            identity:  artifact.identity.clone(),
            backend:   artifact.backend.to_string(),
        }
    }
}

/// Summary of one committed release bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseReport {
    pub image_path:  PathBuf,
    pub image_name:  String,
    pub image_size:  u64,
    pub digests:     DigestResult,
    pub signature:   SignatureRef,
    pub destination: PathBuf,
    pub created_at:  DateTime<Utc>,
}

impl ReleaseReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Release report for {}", self.image_name);
        let _ = writeln!(out);
        let _ = writeln!(out, "Image:       {}", self.image_path.display());
        let _ = writeln!(out, "Size:        {} bytes ({})", self.image_size, human_size(self.image_size));
        let _ = writeln!(out, "Checksums:");
        for (algorithm, hex) in self.digests.iter() {
            let _ = writeln!(out, "  {:<9} {hex}", algorithm.label());
        }
        let _ = writeln!(
            out,
            "Signature:   {} ({}, signed by {})",
            self.signature.file_name, self.signature.backend, self.signature.identity
        );
        let _ = writeln!(out, "Destination: {}", self.destination.display());
        let _ = writeln!(
            out,
            "Created:     {}",
            self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> { serde_json::to_string_pretty(self) }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
