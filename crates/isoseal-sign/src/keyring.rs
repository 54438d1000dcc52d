//! Self-contained signing backend over a directory of Ed25519 keys.
//!
//! Keys live as `<identity>.key` (hex seed, owner-only) and `<identity>.pub`
//! (hex public key). A `<identity>.revoked` marker distrusts a key without
//! deleting it. Images are signed with Ed25519ph over a streamed SHA-512, so
//! the image is never held in memory, and [`SigningBackend::begin`] lets the
//! caller feed that SHA-512 from its own read of the image.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
use isoseal_fs::{AtomicWriteOptions, atomic_write};
use sha2::{Digest, Sha256, Sha512};
use tracing::{debug, info};

use crate::armor::{ArmoredSignature, SIGNATURE_LENGTH};
use crate::{Result, SignError, SignatureArtifact, SigningBackend, StreamSigner, VerificationOutcome};

const NAME: &str = "keyring";
const CONTEXT: &[u8] = b"isoseal-image-v1";

#[derive(Debug, Clone)]
pub struct KeyringBackend {
    dir: PathBuf,
}

impl KeyringBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    /// Create a key pair for `identity` from a 32-byte seed and store it in
    /// `dir`, which is created if needed. Existing keys are overwritten.
    pub fn generate_key(dir: &Path, identity: &str, seed: [u8; 32]) -> Result<VerifyingKey> {
        check_identity(identity)?;
        fs::create_dir_all(dir).map_err(|e| SignError::Output {
            path:   dir.to_path_buf(),
            source: e,
        })?;

        let signing = SigningKey::from_bytes(&seed);
        let verifying = signing.verifying_key();
        atomic_write(
            dir.join(format!("{identity}.key")),
            hex::encode(signing.to_bytes()).as_bytes(),
            AtomicWriteOptions::new().permissions(0o600).sync(true),
        )?;
        atomic_write(
            dir.join(format!("{identity}.pub")),
            hex::encode(verifying.to_bytes()).as_bytes(),
            AtomicWriteOptions::new().sync(true),
        )?;

        info!(identity, fingerprint = %fingerprint(&verifying), "generated signing key");
        Ok(verifying)
    }

    fn ensure_dir(&self) -> Result<()> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(SignError::Environment {
                backend: NAME,
                detail:  format!("keyring directory '{}' does not exist", self.dir.display()),
            })
        }
    }

    fn key_file(&self, identity: &str, ext: &str) -> PathBuf { self.dir.join(format!("{identity}.{ext}")) }

    fn is_revoked(&self, identity: &str) -> bool { self.key_file(identity, "revoked").exists() }

    fn signing_key(&self, identity: &str) -> Result<SigningKey> {
        let unavailable = |detail: String| SignError::KeyUnavailable {
            identity: identity.to_string(),
            detail,
        };
        let path = self.key_file(identity, "key");
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(unavailable(format!("no secret key in '{}'", self.dir.display())));
            }
            Err(e) => return Err(unavailable(format!("cannot read '{}': {e}", path.display()))),
        };
        let seed: [u8; 32] = decode_hex(&text).ok_or_else(|| unavailable("malformed secret key".to_string()))?;
        if self.is_revoked(identity) {
            return Err(unavailable("key is revoked".to_string()));
        }
        Ok(SigningKey::from_bytes(&seed))
    }

    fn key_for_signing(&self, identity: &str) -> Result<SigningKey> {
        self.ensure_dir()?;
        check_identity(identity)?;
        self.signing_key(identity)
    }

    fn verifying_key(&self, identity: &str) -> Option<VerifyingKey> {
        let text = fs::read_to_string(self.key_file(identity, "pub")).ok()?;
        let bytes: [u8; 32] = decode_hex(&text)?;
        VerifyingKey::from_bytes(&bytes).ok()
    }
}

impl SigningBackend for KeyringBackend {
    fn name(&self) -> &'static str { NAME }

    fn signature_extension(&self) -> &'static str { "sig" }

    fn sign(&self, target: &Path, identity: &str, output: &Path) -> Result<SignatureArtifact> {
        let key = self.key_for_signing(identity)?;
        let (prehash, covered_bytes) = prehash(target)?;
        seal(&key, prehash, covered_bytes, identity, target, output)
    }

    fn begin(&self, target: &Path, identity: &str, output: &Path) -> Result<Option<Box<dyn StreamSigner>>> {
        let key = self.key_for_signing(identity)?;
        Ok(Some(Box::new(PrehashSigner {
            key,
            hasher: Sha512::new(),
            bytes: 0,
            identity: identity.to_string(),
            target: target.to_path_buf(),
            output: output.to_path_buf(),
        })))
    }

    fn verify(&self, target: &Path, signature: &Path) -> Result<VerificationOutcome> {
        self.ensure_dir()?;
        let raw = fs::read(signature).map_err(|e| SignError::Input {
            path:   signature.to_path_buf(),
            source: e,
        })?;

        let armored = match std::str::from_utf8(&raw)
            .map_err(|_| "signature is not text".to_string())
            .and_then(|text| ArmoredSignature::parse(text).map_err(|e| e.to_string()))
        {
            Ok(armored) => armored,
            Err(reason) => return Ok(VerificationOutcome::failed(format!("malformed or truncated signature: {reason}"))),
        };

        let signer = armored.signer.as_str();
        if check_identity(signer).is_err() {
            return Ok(VerificationOutcome::failed(format!("invalid signer name '{signer}'")));
        }
        let Some(public) = self.verifying_key(signer) else {
            return Ok(VerificationOutcome::failed(format!(
                "no public key for '{signer}' in '{}'",
                self.dir.display()
            )));
        };
        let actual = fingerprint(&public);
        if actual != armored.fingerprint {
            return Ok(VerificationOutcome::failed(format!(
                "key fingerprint mismatch for '{signer}': signature names {}, keyring has {actual}",
                armored.fingerprint
            )));
        }

        let (prehash, bytes) = prehash(target)?;
        let sig = Signature::from_bytes(&armored.signature);
        let mut outcome = match public.verify_prehashed(prehash, Some(CONTEXT), &sig) {
            Ok(()) => VerificationOutcome::passed(signer).with_line(format!("Good signature from '{signer}'")),
            Err(_) => VerificationOutcome::failed(format!("BAD signature from '{signer}'")),
        };
        if bytes != armored.covered_bytes {
            outcome.push(format!(
                "image size differs: signed {} bytes, found {bytes}",
                armored.covered_bytes
            ));
        }
        outcome.push(format!("Key fingerprint: {actual}"));

        if outcome.authentic && self.is_revoked(signer) {
            outcome.authentic = false;
            outcome.push(format!("key for '{signer}' is revoked"));
        }
        Ok(outcome)
    }
}

/// Ed25519ph signer fed chunk by chunk.
struct PrehashSigner {
    key:      SigningKey,
    hasher:   Sha512,
    bytes:    u64,
    identity: String,
    target:   PathBuf,
    output:   PathBuf,
}

impl StreamSigner for PrehashSigner {
    fn update(&mut self, chunk: &[u8]) {
        Digest::update(&mut self.hasher, chunk);
        self.bytes += chunk.len() as u64;
    }

    fn finish(self: Box<Self>) -> Result<SignatureArtifact> {
        let this = *self;
        seal(&this.key, this.hasher, this.bytes, &this.identity, &this.target, &this.output)
    }
}

/// Sign a finished prehash and write the armored block to `output`.
fn seal(
    key: &SigningKey,
    prehash: Sha512,
    covered_bytes: u64,
    identity: &str,
    target: &Path,
    output: &Path,
) -> Result<SignatureArtifact> {
    let signature = key
        .sign_prehashed(prehash, Some(CONTEXT))
        .map_err(|e| SignError::Crypto(e.to_string()))?;

    let armored = ArmoredSignature {
        signer: identity.to_string(),
        fingerprint: fingerprint(&key.verifying_key()),
        covered_bytes,
        signature: signature.to_bytes(),
    };
    atomic_write(output, armored.encode().as_bytes(), AtomicWriteOptions::new().sync(true))?;
    debug!(target = %target.display(), output = %output.display(), "wrote keyring signature");

    Ok(SignatureArtifact {
        path: output.to_path_buf(),
        identity: identity.to_string(),
        backend: NAME,
        target: target.to_path_buf(),
        covered_bytes,
    })
}

/// Short fingerprint: first 16 hex digits of SHA-256 over the public key.
pub fn fingerprint(key: &VerifyingKey) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..8])
}

/// Stream `target` through SHA-512, returning the hasher and byte count.
fn prehash(target: &Path) -> Result<(Sha512, u64)> {
    let input = |source| SignError::Input {
        path: target.to_path_buf(),
        source,
    };
    let mut file = File::open(target).map_err(input)?;
    let mut hasher = Sha512::new();
    let bytes = io::copy(&mut file, &mut hasher).map_err(input)?;
    Ok((hasher, bytes))
}

fn decode_hex<const N: usize>(text: &str) -> Option<[u8; N]> {
    let bytes = hex::decode(text.trim()).ok()?;
    bytes.try_into().ok()
}

/// Identities double as file names inside the keyring.
fn check_identity(identity: &str) -> Result<()> {
    let valid = !identity.is_empty()
        && !identity.starts_with('.')
        && identity
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '+' | '-'));
    if valid {
        Ok(())
    } else {
        Err(SignError::KeyUnavailable {
            identity: identity.to_string(),
            detail:   "identity must be a non-empty name of letters, digits and @._+-".to_string(),
        })
    }
}

const _: () = assert!(SIGNATURE_LENGTH == ed25519_dalek::SIGNATURE_LENGTH);
