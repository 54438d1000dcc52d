use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, TryLockError};

use isoseal_digest::{
    AlgorithmSet, CancellationToken, DigestEngine, ProgressRange, ProgressSink, ProgressTracker, ScaledProgress,
};
use isoseal_sign::SignatureManager;
use tracing::{info, warn};

use crate::bundle::ReleaseBundler;
use crate::job::{Job, JobKind, JobState};
use crate::report::ReleaseReport;
use crate::verify::VerificationEngine;
use crate::{EngineConfig, EngineError, LogSink, Result};

const HASH_RANGE: ProgressRange = ProgressRange::new(0, 90);
const SIGN_DONE: u8 = 95;

/// Inputs for one signing job.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub iso_path:    PathBuf,
    pub output_root: PathBuf,
    pub algorithms:  AlgorithmSet,
    /// Overrides the manager's configured identity.
    pub identity:    Option<String>,
}

impl SigningRequest {
    pub fn new(iso_path: impl Into<PathBuf>, output_root: impl Into<PathBuf>, algorithms: AlgorithmSet) -> Self {
        Self {
            iso_path: iso_path.into(),
            output_root: output_root.into(),
            algorithms,
            identity: None,
        }
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }
}

/// What a finished signing job produced.
#[derive(Debug, Clone)]
pub struct SigningOutcome {
    /// Rendered text report, as written to the bundle.
    pub report:      String,
    pub destination: PathBuf,
    pub release:     ReleaseReport,
}

/// Runs signing and verification jobs.
///
/// At most one signing and one verification job run at a time; a second
/// request of the same kind is rejected with [`EngineError::Busy`].
pub struct Engine {
    config:    EngineConfig,
    digest:    DigestEngine,
    signer:    SignatureManager,
    signing:   Mutex<()>,
    verifying: Mutex<()>,
}

impl Engine {
    pub fn new(config: EngineConfig, signer: SignatureManager) -> Self {
        Self {
            digest: config.digest_engine(),
            config,
            signer,
            signing: Mutex::new(()),
            verifying: Mutex::new(()),
        }
    }

    /// Engine with the signing backend described by `config`.
    pub fn from_config(config: EngineConfig) -> Self {
        let signer = config.signature_manager();
        Self::new(config, signer)
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn signature_manager(&self) -> &SignatureManager { &self.signer }

    /// Hash, sign and bundle `request.iso_path`.
    ///
    /// Progress runs 0-90 while hashing, reaches 95 once signed and 100 only
    /// after the bundle is committed. On any failure the previous bundle, if
    /// any, is left as it was.
    pub fn execute_signing_process(
        &self,
        request: &SigningRequest,
        log: &dyn LogSink,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<SigningOutcome> {
        let _guard =
            claim(&self.signing, "signing").inspect_err(|e| log.log(&format!("Signing rejected: {e}")))?;
        let tracker = ProgressTracker::new(progress);
        let mut job = Job::new(JobKind::Signing);

        match self.run_signing(&mut job, request, log, &tracker, cancel) {
            Ok(outcome) => {
                job.advance(JobState::Done)?;
                tracker.finish();
                log.log(&format!("Release bundle written to {}", outcome.destination.display()));
                Ok(outcome)
            }
            Err(e) => {
                job.fail();
                warn!(error = %e, kind = ?e.kind(), "signing job failed");
                log.log(&format!("Signing failed: {e}"));
                Err(e)
            }
        }
    }

    fn run_signing(
        &self,
        job: &mut Job,
        request: &SigningRequest,
        log: &dyn LogSink,
        tracker: &ProgressTracker<'_>,
        cancel: &CancellationToken,
    ) -> Result<SigningOutcome> {
        let image = request.iso_path.as_path();
        validate_image(image)?;
        if request.algorithms.is_empty() {
            return Err(EngineError::NoAlgorithms);
        }
        let bundler = ReleaseBundler::new(&request.output_root);
        std::fs::create_dir_all(&request.output_root)
            .map_err(|e| EngineError::input(&request.output_root, format!("cannot create output directory: {e}")))?;
        let destination = bundler.check_destination(image)?;

        let scratch = tempfile::Builder::new()
            .prefix(".isoseal-")
            .suffix(".scratch")
            .tempdir_in(&request.output_root)
            .map_err(|e| EngineError::Io {
                path:   request.output_root.clone(),
                source: e,
            })?;
        let output = scratch.path().join(self.signature_name(image));
        let mut streamed = match request.identity.as_deref() {
            Some(identity) => self.signer.begin_as(image, identity, &output)?,
            None => self.signer.begin(image, &output)?,
        };

        enter(job, JobState::Hashing, log)?;
        let names: Vec<_> = request.algorithms.iter().map(|a| a.label()).collect();
        log.log(&format!("Hashing {} ({})", image.display(), names.join(", ")));
        let mut feed = |chunk: &[u8]| {
            if let Some(signer) = streamed.as_mut() {
                signer.update(chunk);
            }
        };
        let hashed = self.digest.digest_with(
            image,
            &request.algorithms,
            &mut feed,
            &ScaledProgress::new(tracker, HASH_RANGE),
            cancel,
        )?;
        if !hashed.result.covers_exactly(&request.algorithms) {
            return Err(EngineError::Io {
                path:   image.to_path_buf(),
                source: std::io::Error::other("digest set does not match the requested algorithms"),
            });
        }
        for (algorithm, hex) in hashed.result.iter() {
            log.log(&format!("{}: {hex}", algorithm.label()));
        }

        checkpoint(cancel)?;
        enter(job, JobState::Signing, log)?;
        let artifact = match streamed {
            Some(signer) => signer.finish()?,
            // The backend reads the image on its own.
            None => match request.identity.as_deref() {
                Some(identity) => self.signer.sign_as(image, identity, &output)?,
                None => self.signer.sign(image, &output)?,
            },
        };
        if artifact.covered_bytes != hashed.bytes {
            return Err(EngineError::ImageChanged {
                path:   image.to_path_buf(),
                hashed: hashed.bytes,
                signed: artifact.covered_bytes,
            });
        }
        log.log(&format!(
            "Signed as {} with {} ({})",
            artifact.identity,
            artifact.backend,
            artifact.file_name()
        ));
        tracker.report(SIGN_DONE);

        checkpoint(cancel)?;
        enter(job, JobState::Bundling, log)?;
        let release = bundler.bundle(image, hashed.bytes, &hashed.result, &artifact)?;
        drop(scratch);

        info!(
            image = %image.display(),
            destination = %destination.display(),
            bytes = hashed.bytes,
            "release bundle complete"
        );
        Ok(SigningOutcome {
            report: release.render(),
            destination: release.destination.clone(),
            release,
        })
    }

    fn signature_name(&self, image: &Path) -> String {
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{name}.{}", self.signer.signature_extension())
    }

    /// Check `signature_path` against `iso_path`.
    ///
    /// Returns `Ok(false)` for a signature that does not verify; errors mean
    /// no verdict could be reached.
    pub fn verify_iso_signature(&self, iso_path: &Path, signature_path: &Path, log: &dyn LogSink) -> Result<bool> {
        let _guard =
            claim(&self.verifying, "verification").inspect_err(|e| log.log(&format!("Verification rejected: {e}")))?;
        let mut job = Job::new(JobKind::Verification);
        enter(&mut job, JobState::Verifying, log)?;

        match VerificationEngine::new(&self.signer).verify(iso_path, signature_path, log) {
            Ok(authentic) => {
                let next = if authentic { JobState::Passed } else { JobState::Rejected };
                enter(&mut job, next, log)?;
                Ok(authentic)
            }
            Err(e) => {
                job.fail();
                warn!(error = %e, kind = ?e.kind(), "verification job failed");
                Err(e)
            }
        }
    }
}

fn claim<'a>(lock: &'a Mutex<()>, what: &'static str) -> Result<MutexGuard<'a, ()>> {
    match lock.try_lock() {
        Ok(guard) => Ok(guard),
        // A panic in an earlier job leaves nothing behind worth protecting.
        Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => Err(EngineError::Busy(what)),
    }
}

fn enter(job: &mut Job, next: JobState, log: &dyn LogSink) -> Result<()> {
    job.advance(next)?;
    info!(state = %next, "job state");
    log.log(&format!("[{next}]"));
    Ok(())
}

fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(EngineError::Cancelled)
    } else {
        Ok(())
    }
}

fn validate_image(image: &Path) -> Result<()> {
    match std::fs::metadata(image) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(EngineError::input(image, "not a regular file")),
        Err(e) => Err(EngineError::input(image, e.to_string())),
    }
}
