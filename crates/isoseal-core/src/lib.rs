//! Tamper-evident release bundles for disk images.
//!
//! An [`Engine`] turns an image into a release bundle in three phases:
//! one streaming pass computes every requested digest, the configured
//! signing backend produces a detached signature over the image, and the
//! checksums, signature and a report are swapped into
//! `<output_root>/<image stem>/` as a unit. [`Engine::verify_iso_signature`]
//! answers whether an image still matches its signature.
//!
//! Callers observe a job through a [`LogSink`] (ordered lines) and a
//! [`ProgressSink`] (non-decreasing percentages ending at 100), or run it on
//! a background thread with [`worker::spawn_signing`].

mod bundle;
mod config;
mod engine;
mod error;
mod job;
mod report;
mod sink;
mod verify;
pub mod worker;

pub use bundle::{REPORT_JSON, REPORT_TEXT, ReleaseBundler};
pub use config::{BackendConfig, CONFIG_ENV, EngineConfig};
pub use engine::{Engine, SigningOutcome, SigningRequest};
pub use error::{EngineError, ErrorKind, Result};
pub use job::{Job, JobKind, JobState};
pub use report::{ReleaseReport, SignatureRef};
pub use sink::{CollectingSink, LogSink, NoProgress, NullLog, ProgressSink};
pub use verify::VerificationEngine;

pub use isoseal_digest::{AlgorithmSet, CancellationToken, DigestAlgorithm, DigestResult};
pub use isoseal_sign::{SignatureArtifact, SignatureManager, VerificationOutcome};
