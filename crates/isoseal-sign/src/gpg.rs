//! GnuPG backend.
//!
//! Signing shells out to `gpg --detach-sign`; verification runs
//! `gpg --verify --status-fd 1` and reads the machine-readable `[GNUPG:]`
//! status stream instead of the localized human output.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::command::{Command, CommandRunner, SystemRunner};
use crate::{Result, SignError, SignatureArtifact, SigningBackend, VerificationOutcome};

const NAME: &str = "gpg";
const STATUS_PREFIX: &str = "[GNUPG:] ";

pub struct GpgBackend<R = SystemRunner> {
    runner:  R,
    program: String,
    homedir: Option<PathBuf>,
}

impl Default for GpgBackend<SystemRunner> {
    fn default() -> Self { Self::new() }
}

impl GpgBackend<SystemRunner> {
    pub fn new() -> Self { Self::with_runner(SystemRunner) }
}

impl<R: CommandRunner> GpgBackend<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            program: "gpg".to_string(),
            homedir: None,
        }
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn homedir(mut self, homedir: impl Into<PathBuf>) -> Self {
        self.homedir = Some(homedir.into());
        self
    }

    fn base_command(&self) -> Command {
        let cmd = Command::new(&self.program).arg("--batch");
        match &self.homedir {
            Some(home) => cmd.arg("--homedir").arg(home),
            None => cmd,
        }
    }

    fn run(&self, command: &Command) -> Result<crate::CommandOutput> {
        debug!(command = %command.display(), "running gpg");
        self.runner.run(command).map_err(|e| SignError::Environment {
            backend: NAME,
            detail:  match e.kind() {
                io::ErrorKind::NotFound => format!("'{}' not found on PATH", self.program),
                _ => format!("failed to start '{}': {e}", self.program),
            },
        })
    }
}

impl<R: CommandRunner> SigningBackend for GpgBackend<R> {
    fn name(&self) -> &'static str { NAME }

    fn signature_extension(&self) -> &'static str { "sig.asc" }

    fn sign(&self, target: &Path, identity: &str, output: &Path) -> Result<SignatureArtifact> {
        let covered_bytes = std::fs::metadata(target)
            .map_err(|e| SignError::Input {
                path:   target.to_path_buf(),
                source: e,
            })?
            .len();

        let command = self
            .base_command()
            .arg("--yes")
            .args(["--local-user", identity])
            .args(["--armor", "--detach-sign", "--output"])
            .arg(output)
            .arg(target);
        let out = self.run(&command)?;

        if !out.success() {
            let stderr = out.stderr_lossy();
            return Err(classify_sign_failure(identity, stderr.trim()));
        }
        if !output.is_file() {
            return Err(SignError::Crypto(format!(
                "gpg reported success but wrote no signature to '{}'",
                output.display()
            )));
        }

        Ok(SignatureArtifact {
            path: output.to_path_buf(),
            identity: identity.to_string(),
            backend: NAME,
            target: target.to_path_buf(),
            covered_bytes,
        })
    }

    fn verify(&self, target: &Path, signature: &Path) -> Result<VerificationOutcome> {
        for path in [target, signature] {
            std::fs::metadata(path).map_err(|e| SignError::Input {
                path:   path.to_path_buf(),
                source: e,
            })?;
        }

        let command = self
            .base_command()
            .args(["--status-fd", "1", "--verify"])
            .arg(signature)
            .arg(target);
        let out = self.run(&command)?;

        let status = StatusReport::parse(&out.stdout_lossy());
        if status.is_empty() && !out.success() {
            // No status at all means gpg never got as far as reading the signature.
            return Err(SignError::Environment {
                backend: NAME,
                detail:  out.stderr_lossy().trim().to_string(),
            });
        }
        Ok(status.outcome())
    }
}

fn classify_sign_failure(identity: &str, stderr: &str) -> SignError {
    let lower = stderr.to_ascii_lowercase();
    if lower.contains("no secret key")
        || lower.contains("secret key not available")
        || lower.contains("unusable secret key")
        || lower.contains("skipped: no public key")
    {
        SignError::KeyUnavailable {
            identity: identity.to_string(),
            detail:   stderr.to_string(),
        }
    } else if lower.contains("can't connect to the agent") || lower.contains("no pinentry") {
        SignError::Environment {
            backend: NAME,
            detail:  stderr.to_string(),
        }
    } else {
        SignError::Crypto(stderr.to_string())
    }
}

/// The subset of `--status-fd` keywords that decide authenticity.
#[derive(Debug, Default, PartialEq, Eq)]
struct StatusReport {
    good:        Option<(String, String)>,
    bad:         Option<(String, String)>,
    expired_key: Option<(String, String)>,
    revoked_key: Option<(String, String)>,
    error_key:   Option<String>,
    no_pubkey:   Option<String>,
    no_data:     bool,
    valid_fpr:   Option<String>,
    trust:       Option<String>,
    seen:        usize,
}

impl StatusReport {
    fn parse(stdout: &str) -> Self {
        let mut report = Self::default();
        for line in stdout.lines() {
            let Some(rest) = line.strip_prefix(STATUS_PREFIX) else {
                continue;
            };
            report.seen += 1;
            let (keyword, args) = rest.split_once(' ').unwrap_or((rest, ""));
            let key_and_user = || {
                let (key, user) = args.split_once(' ').unwrap_or((args, ""));
                (key.to_string(), user.to_string())
            };
            let first = || args.split_whitespace().next().unwrap_or_default().to_string();
            match keyword {
                "GOODSIG" => report.good = Some(key_and_user()),
                "BADSIG" => report.bad = Some(key_and_user()),
                "EXPKEYSIG" => report.expired_key = Some(key_and_user()),
                "REVKEYSIG" => report.revoked_key = Some(key_and_user()),
                "ERRSIG" => report.error_key = Some(first()),
                "NO_PUBKEY" => report.no_pubkey = Some(first()),
                "NODATA" => report.no_data = true,
                "VALIDSIG" => report.valid_fpr = Some(first()),
                k if k.starts_with("TRUST_") => report.trust = Some(k.trim_start_matches("TRUST_").to_string()),
                _ => {}
            }
        }
        report
    }

    fn is_empty(&self) -> bool { self.seen == 0 }

    fn outcome(&self) -> VerificationOutcome {
        if self.no_data {
            return VerificationOutcome::failed("malformed or truncated signature: no signature data found");
        }
        if let Some((key, user)) = &self.bad {
            return VerificationOutcome::failed(format!("BAD signature from {user} ({key})"));
        }
        if let Some((key, user)) = &self.revoked_key {
            return VerificationOutcome::failed(format!("signature by revoked key {key} ({user})"));
        }
        if let Some(key) = self.no_pubkey.as_ref().or(self.error_key.as_ref()) {
            return VerificationOutcome::failed(format!("cannot check signature: public key {key} not found"));
        }

        let mut outcome = match (&self.good, &self.expired_key) {
            (Some((key, user)), _) => {
                VerificationOutcome::passed(user.clone()).with_line(format!("Good signature from {user} ({key})"))
            }
            (None, Some((key, user))) => VerificationOutcome::passed(user.clone())
                .with_line(format!("Good signature from {user} ({key})"))
                .with_line("warning: signing key has expired"),
            (None, None) => return VerificationOutcome::failed("gpg reported no signature verdict"),
        };

        if let Some(fpr) = &self.valid_fpr {
            outcome.push(format!("Primary key fingerprint: {fpr}"));
        }
        match self.trust.as_deref() {
            Some("NEVER") => {
                warn!("signer key is explicitly distrusted");
                outcome.authentic = false;
                outcome.push("signer key is explicitly distrusted");
            }
            Some(level) => outcome.push(format!("Trust level: {level}")),
            None => {}
        }
        outcome
    }
}
