use std::path::Path;

use isoseal_sign::SignatureManager;

use crate::{LogSink, Result};

/// Answers "is this image authentic and intact?" for one signature.
pub struct VerificationEngine<'a> {
    manager: &'a SignatureManager,
}

impl<'a> VerificationEngine<'a> {
    pub fn new(manager: &'a SignatureManager) -> Self { Self { manager } }

    /// Check `signature` against `image`, streaming diagnostics to `log`.
    ///
    /// A signature that does not match is `Ok(false)`; only trouble that
    /// prevents a verdict is an error.
    pub fn verify(&self, image: &Path, signature: &Path, log: &dyn LogSink) -> Result<bool> {
        log.log(&format!(
            "Verifying {} against {} ({})",
            display_name(image),
            display_name(signature),
            self.manager.backend_name()
        ));

        let outcome = match self.manager.verify(image, signature) {
            Ok(outcome) => outcome,
            Err(e) => {
                log.log(&format!("Cannot determine authenticity: {e}"));
                return Err(e.into());
            }
        };

        if let Some(signer) = &outcome.signer {
            log.log(&format!("Signer: {signer}"));
        }
        for line in &outcome.lines {
            log.log(line);
        }
        log.log(if outcome.authentic {
            "Signature is valid: image is authentic and intact"
        } else {
            "Signature is NOT valid: image may be corrupted or tampered with"
        });
        Ok(outcome.authentic)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
