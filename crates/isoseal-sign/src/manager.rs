use std::path::Path;

use tracing::{debug, info, warn};

use crate::{Result, SignError, SignatureArtifact, SigningBackend, StreamSigner, VerificationOutcome};

/// Signs and verifies images through one configured backend.
pub struct SignatureManager {
    backend:  Box<dyn SigningBackend>,
    identity: Option<String>,
}

impl SignatureManager {
    pub fn new(backend: impl SigningBackend + 'static) -> Self {
        Self {
            backend:  Box::new(backend),
            identity: None,
        }
    }

    /// Identity used by [`SignatureManager::sign`].
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn backend_name(&self) -> &'static str { self.backend.name() }

    pub fn signature_extension(&self) -> &'static str { self.backend.signature_extension() }

    pub fn default_identity(&self) -> Option<&str> { self.identity.as_deref() }

    /// Sign `target` as the configured identity.
    pub fn sign(&self, target: &Path, output: &Path) -> Result<SignatureArtifact> {
        self.sign_as(target, self.configured_identity()?, output)
    }

    pub fn sign_as(&self, target: &Path, identity: &str, output: &Path) -> Result<SignatureArtifact> {
        check_request(target, identity)?;
        let artifact = self.backend.sign(target, identity, output)?;
        info!(
            backend = self.backend.name(),
            identity,
            signature = %artifact.path.display(),
            "signed image"
        );
        Ok(artifact)
    }

    /// Start a signature the caller feeds with the image bytes, as the
    /// configured identity. `None` when the backend reads the image itself.
    pub fn begin(&self, target: &Path, output: &Path) -> Result<Option<Box<dyn StreamSigner>>> {
        self.begin_as(target, self.configured_identity()?, output)
    }

    pub fn begin_as(&self, target: &Path, identity: &str, output: &Path) -> Result<Option<Box<dyn StreamSigner>>> {
        check_request(target, identity)?;
        let signer = self.backend.begin(target, identity, output)?;
        debug!(backend = self.backend.name(), identity, streamed = signer.is_some(), "signature started");
        Ok(signer)
    }

    fn configured_identity(&self) -> Result<&str> {
        self.identity.as_deref().ok_or_else(|| SignError::KeyUnavailable {
            identity: String::new(),
            detail:   "no signing identity configured".to_string(),
        })
    }

    pub fn verify(&self, target: &Path, signature: &Path) -> Result<VerificationOutcome> {
        for path in [target, signature] {
            if !path.is_file() {
                return Err(not_a_file(path));
            }
        }

        let outcome = self.backend.verify(target, signature)?;
        if outcome.authentic {
            info!(backend = self.backend.name(), signer = ?outcome.signer, "signature verified");
        } else {
            warn!(backend = self.backend.name(), reason = ?outcome.lines.first(), "signature rejected");
        }
        Ok(outcome)
    }
}

fn check_request(target: &Path, identity: &str) -> Result<()> {
    if identity.trim().is_empty() {
        return Err(SignError::KeyUnavailable {
            identity: identity.to_string(),
            detail:   "empty signing identity".to_string(),
        });
    }
    if !target.is_file() {
        return Err(not_a_file(target));
    }
    Ok(())
}

fn not_a_file(path: &Path) -> SignError {
    SignError::Input {
        path:   path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a readable file"),
    }
}
