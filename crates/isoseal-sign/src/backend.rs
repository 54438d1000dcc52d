use std::path::{Path, PathBuf};

use crate::Result;

/// A detached signature written next to the bytes it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureArtifact {
    pub path:          PathBuf,
    pub identity:      String,
    pub backend:       &'static str,
    pub target:        PathBuf,
    /// Size of the target at signing time.
    pub covered_bytes: u64,
}

impl SignatureArtifact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Result of checking a signature against an image.
///
/// `lines` carries the human-readable diagnostics reported to the operator,
/// in the order the backend produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub authentic: bool,
    pub signer:    Option<String>,
    pub lines:     Vec<String>,
}

impl VerificationOutcome {
    pub fn passed(signer: impl Into<String>) -> Self {
        Self {
            authentic: true,
            signer:    Some(signer.into()),
            lines:     Vec::new(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            authentic: false,
            signer:    None,
            lines:     vec![reason.into()],
        }
    }

    pub fn push(&mut self, line: impl Into<String>) { self.lines.push(line.into()); }

    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.push(line);
        self
    }
}

/// A signature accumulated from image bytes the caller feeds in order.
///
/// Lets a job sign from the same read pass that computes its digests.
pub trait StreamSigner: Send {
    fn update(&mut self, chunk: &[u8]);

    /// Write the signature over every byte fed so far.
    fn finish(self: Box<Self>) -> Result<SignatureArtifact>;
}

/// A signing tool or key store able to produce and check detached signatures.
///
/// Implementations report *environmental* trouble (tool missing, key store
/// absent) as errors, and *cryptographic* rejection of a signature as an
/// unauthentic [`VerificationOutcome`].
pub trait SigningBackend: Send + Sync {
    /// Short backend name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Extension appended to the image file name, without the leading dot.
    fn signature_extension(&self) -> &'static str;

    /// Write a detached signature over `target` to `output`.
    fn sign(&self, target: &Path, identity: &str, output: &Path) -> Result<SignatureArtifact>;

    /// Start a signature over `target` whose bytes are supplied by the caller.
    ///
    /// Backends that have to read the file themselves return `None`; the
    /// caller then falls back to [`sign`](Self::sign).
    fn begin(&self, target: &Path, identity: &str, output: &Path) -> Result<Option<Box<dyn StreamSigner>>> {
        let _ = (target, identity, output);
        Ok(None)
    }

    fn verify(&self, target: &Path, signature: &Path) -> Result<VerificationOutcome>;
}

impl<B: SigningBackend + ?Sized> SigningBackend for Box<B> {
    fn name(&self) -> &'static str { (**self).name() }

    fn signature_extension(&self) -> &'static str { (**self).signature_extension() }

    fn sign(&self, target: &Path, identity: &str, output: &Path) -> Result<SignatureArtifact> {
        (**self).sign(target, identity, output)
    }

    fn begin(&self, target: &Path, identity: &str, output: &Path) -> Result<Option<Box<dyn StreamSigner>>> {
        (**self).begin(target, identity, output)
    }

    fn verify(&self, target: &Path, signature: &Path) -> Result<VerificationOutcome> {
        (**self).verify(target, signature)
    }
}
