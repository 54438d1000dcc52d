use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use isoseal_core::{
    AlgorithmSet, CancellationToken, CollectingSink, DigestAlgorithm, Engine, EngineConfig, ErrorKind, NoProgress,
    NullLog, SignatureManager, SigningRequest,
};
use isoseal_fs::{DirLock, LOCK_FILE_NAME};
use isoseal_sign::{KeyringBackend, SignatureArtifact, SigningBackend, StreamSigner, VerificationOutcome};
use md5::Md5;
use sha2::{Digest, Sha256};
use tempfile::{TempDir, tempdir};

const ID: &str = "release@example.org";

struct Fixture {
    dir:    TempDir,
    engine: Engine,
    image:  PathBuf,
    out:    PathBuf,
}

fn fixture(size: usize) -> Fixture {
    let dir = tempdir().unwrap();
    let keys = dir.path().join("keys");
    KeyringBackend::generate_key(&keys, ID, [42u8; 32]).unwrap();
    let manager = SignatureManager::new(KeyringBackend::new(keys)).identity(ID);
    let engine = Engine::new(EngineConfig::default(), manager);

    let image = dir.path().join("distro.iso");
    let content: Vec<u8> = (0..size).map(|i| (i.wrapping_mul(31) ^ (i >> 9)) as u8).collect();
    fs::write(&image, content).unwrap();
    let out = dir.path().join("release");

    Fixture { dir, engine, image, out }
}

fn sha256_md5() -> AlgorithmSet { AlgorithmSet::new([DigestAlgorithm::Sha256, DigestAlgorithm::Md5]).unwrap() }

fn hidden_entries(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with('.') && n != LOCK_FILE_NAME)
        .collect()
}

#[test]
fn test_ten_mib_image_with_sha256_and_md5() {
    let fx = fixture(10 * 1024 * 1024);
    let seen = Mutex::new(Vec::new());
    let progress = |p: u8| seen.lock().unwrap().push(p);
    let log = CollectingSink::new();

    let request = SigningRequest::new(&fx.image, &fx.out, sha256_md5());
    let outcome = fx
        .engine
        .execute_signing_process(&request, &log, &progress, &CancellationToken::new())
        .unwrap();

    let bytes = fs::read(&fx.image).unwrap();
    let sha = hex::encode(Sha256::digest(&bytes));
    let md5 = hex::encode(Md5::digest(&bytes));

    let dest = &outcome.destination;
    assert!(dest.is_absolute());
    assert_eq!(dest.file_name().unwrap(), "distro");
    assert_eq!(
        fs::read_to_string(dest.join("distro.iso.sha256")).unwrap(),
        format!("{sha}  distro.iso\n")
    );
    assert_eq!(
        fs::read_to_string(dest.join("distro.iso.md5")).unwrap(),
        format!("{md5}  distro.iso\n")
    );

    let mut names: Vec<_> = fs::read_dir(dest)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        ["distro.iso.md5", "distro.iso.sha256", "distro.iso.sig", "report.json", "report.txt"]
    );

    assert!(outcome.report.contains("distro.iso"));
    assert!(outcome.report.contains(&sha));
    assert!(outcome.report.contains(&md5));
    assert_eq!(fs::read_to_string(dest.join("report.txt")).unwrap(), outcome.report);
    assert_eq!(outcome.release.image_size, 10 * 1024 * 1024);

    let verdict = fx
        .engine
        .verify_iso_signature(&fx.image, &dest.join("distro.iso.sig"), &NullLog)
        .unwrap();
    assert!(verdict);

    let seen = seen.into_inner().unwrap();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&100));
    assert_eq!(seen.iter().filter(|&&p| p == 100).count(), 1);

    let lines = log.lines();
    let order: Vec<_> = ["[HASHING]", "[SIGNING]", "[BUNDLING]"]
        .iter()
        .map(|s| lines.iter().position(|l| l == s).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));
    assert!(lines.last().unwrap().starts_with("Release bundle written to"));

    assert!(hidden_entries(&fx.out).is_empty());
}

#[test]
fn test_rerun_replaces_previous_bundle() {
    let fx = fixture(64 * 1024);
    let first = SigningRequest::new(&fx.image, &fx.out, sha256_md5());
    fx.engine
        .execute_signing_process(&first, &NullLog, &NoProgress, &CancellationToken::new())
        .unwrap();

    let second = SigningRequest::new(&fx.image, &fx.out, AlgorithmSet::new([DigestAlgorithm::Sha512]).unwrap());
    let outcome = fx
        .engine
        .execute_signing_process(&second, &NullLog, &NoProgress, &CancellationToken::new())
        .unwrap();

    let dest = outcome.destination;
    assert!(dest.join("distro.iso.sha512").exists());
    assert!(!dest.join("distro.iso.md5").exists());
    assert!(!dest.join("distro.iso.sha256").exists());

    let bundles: Vec<_> = fs::read_dir(&fx.out)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .collect();
    assert_eq!(bundles.len(), 1);
    assert!(hidden_entries(&fx.out).is_empty());
}

#[test]
fn test_cancel_before_signing_keeps_previous_bundle() {
    let fx = fixture(256 * 1024);
    let request = SigningRequest::new(&fx.image, &fx.out, sha256_md5());
    let first = fx
        .engine
        .execute_signing_process(&request, &NullLog, &NoProgress, &CancellationToken::new())
        .unwrap();
    let before = fs::read_to_string(first.destination.join("report.txt")).unwrap();

    let token = CancellationToken::new();
    let seen = Mutex::new(Vec::new());
    let progress = |p: u8| {
        seen.lock().unwrap().push(p);
        // Hashing is complete once the job reaches 90.
        if p >= 90 {
            token.cancel();
        }
    };
    let err = fx
        .engine
        .execute_signing_process(&request, &NullLog, &progress, &token)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(!seen.into_inner().unwrap().contains(&100));
    assert_eq!(fs::read_to_string(first.destination.join("report.txt")).unwrap(), before);
    assert!(hidden_entries(&fx.out).is_empty());
}

#[test]
fn test_cancel_during_hashing() {
    let fx = fixture(256 * 1024);
    let token = CancellationToken::new();
    token.cancel();

    let request = SigningRequest::new(&fx.image, &fx.out, sha256_md5());
    let err = fx
        .engine
        .execute_signing_process(&request, &NullLog, &NoProgress, &token)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(!fx.out.join("distro").exists());
}

#[test]
fn test_unknown_identity_fails_without_touching_bundle() {
    let fx = fixture(4096);
    let request = SigningRequest::new(&fx.image, &fx.out, sha256_md5());
    let first = fx
        .engine
        .execute_signing_process(&request, &NullLog, &NoProgress, &CancellationToken::new())
        .unwrap();
    let sig_before = fs::read(first.destination.join("distro.iso.sig")).unwrap();

    let log = CollectingSink::new();
    let err = fx
        .engine
        .execute_signing_process(&request.clone().identity("stranger"), &log, &NoProgress, &CancellationToken::new())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Crypto);
    assert!(log.lines().last().unwrap().contains("stranger"));
    assert_eq!(fs::read(first.destination.join("distro.iso.sig")).unwrap(), sig_before);
    assert!(hidden_entries(&fx.out).is_empty());
}

#[test]
fn test_second_signing_job_is_rejected_while_one_runs() {
    let fx = fixture(128 * 1024);
    let request = SigningRequest::new(&fx.image, &fx.out, sha256_md5());
    let nested = Mutex::new(None);
    let progress = |p: u8| {
        let mut nested = nested.lock().unwrap();
        if p > 0 && nested.is_none() {
            let result = fx
                .engine
                .execute_signing_process(&request, &NullLog, &NoProgress, &CancellationToken::new());
            *nested = Some(result.map(|_| ()).map_err(|e| e.kind()));
        }
    };

    fx.engine
        .execute_signing_process(&request, &NullLog, &progress, &CancellationToken::new())
        .unwrap();
    assert_eq!(nested.into_inner().unwrap(), Some(Err(ErrorKind::Busy)));
}

#[test]
fn test_locked_output_root_is_busy() {
    let fx = fixture(4096);
    fs::create_dir_all(&fx.out).unwrap();
    let _lock = DirLock::try_acquire(&fx.out).unwrap();

    let request = SigningRequest::new(&fx.image, &fx.out, sha256_md5());
    let err = fx
        .engine
        .execute_signing_process(&request, &NullLog, &NoProgress, &CancellationToken::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Busy);
    assert!(!fx.out.join("distro").exists());
}

fn keyring_engine(dir: &Path) -> Engine {
    let keys = dir.join("keys");
    KeyringBackend::generate_key(&keys, ID, [42u8; 32]).unwrap();
    Engine::new(EngineConfig::default(), SignatureManager::new(KeyringBackend::new(keys)).identity(ID))
}

#[test]
fn test_image_named_like_its_bundle_is_rejected() {
    let dir = tempdir().unwrap();
    let engine = keyring_engine(dir.path());
    let out = dir.path().join("rel");
    fs::create_dir_all(&out).unwrap();
    let image = out.join("disk.img");
    fs::write(&image, vec![9u8; 8192]).unwrap();

    let log = CollectingSink::new();
    let request = SigningRequest::new(&image, &out, sha256_md5());
    let err = engine
        .execute_signing_process(&request, &log, &NoProgress, &CancellationToken::new())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(log.lines().last().unwrap().starts_with("Signing failed"));
    assert!(image.is_file());
    assert_eq!(fs::read(&image).unwrap(), vec![9u8; 8192]);
    assert!(hidden_entries(&out).is_empty());
}

#[test]
fn test_image_inside_its_bundle_directory_is_rejected() {
    let dir = tempdir().unwrap();
    let engine = keyring_engine(dir.path());
    let out = dir.path().join("rel");
    fs::create_dir_all(out.join("distro")).unwrap();
    let image = out.join("distro").join("distro.iso");
    fs::write(&image, vec![5u8; 8192]).unwrap();

    let request = SigningRequest::new(&image, &out, sha256_md5());
    let err = engine
        .execute_signing_process(&request, &NullLog, &NoProgress, &CancellationToken::new())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(image.is_file());
    assert_eq!(fs::read(&image).unwrap(), vec![5u8; 8192]);
}

#[derive(Default)]
struct Counts {
    file_signs: AtomicUsize,
    streams:    AtomicUsize,
}

/// Keyring backend that counts how the image reaches it.
struct CountingBackend {
    inner:  KeyringBackend,
    stream: bool,
    counts: Arc<Counts>,
}

impl SigningBackend for CountingBackend {
    fn name(&self) -> &'static str { self.inner.name() }

    fn signature_extension(&self) -> &'static str { self.inner.signature_extension() }

    fn sign(&self, target: &Path, identity: &str, output: &Path) -> isoseal_sign::Result<SignatureArtifact> {
        self.counts.file_signs.fetch_add(1, Ordering::SeqCst);
        self.inner.sign(target, identity, output)
    }

    fn begin(
        &self,
        target: &Path,
        identity: &str,
        output: &Path,
    ) -> isoseal_sign::Result<Option<Box<dyn StreamSigner>>> {
        if !self.stream {
            return Ok(None);
        }
        self.counts.streams.fetch_add(1, Ordering::SeqCst);
        self.inner.begin(target, identity, output)
    }

    fn verify(&self, target: &Path, signature: &Path) -> isoseal_sign::Result<VerificationOutcome> {
        self.inner.verify(target, signature)
    }
}

fn counting_engine(fx: &Fixture, stream: bool) -> (Engine, Arc<Counts>) {
    let counts = Arc::new(Counts::default());
    let backend = CountingBackend {
        inner: KeyringBackend::new(fx.dir.path().join("keys")),
        stream,
        counts: Arc::clone(&counts),
    };
    let engine = Engine::new(EngineConfig::default(), SignatureManager::new(backend).identity(ID));
    (engine, counts)
}

#[test]
fn test_streaming_backend_signs_from_the_digest_pass() {
    let fx = fixture(300 * 1024);
    let (engine, counts) = counting_engine(&fx, true);

    let request = SigningRequest::new(&fx.image, &fx.out, sha256_md5());
    let outcome = engine
        .execute_signing_process(&request, &NullLog, &NoProgress, &CancellationToken::new())
        .unwrap();

    assert_eq!(counts.streams.load(Ordering::SeqCst), 1);
    assert_eq!(counts.file_signs.load(Ordering::SeqCst), 0);
    let sig = outcome.destination.join("distro.iso.sig");
    assert!(engine.verify_iso_signature(&fx.image, &sig, &NullLog).unwrap());
}

#[test]
fn test_backend_without_streaming_signs_the_file() {
    let fx = fixture(64 * 1024);
    let (engine, counts) = counting_engine(&fx, false);

    let request = SigningRequest::new(&fx.image, &fx.out, sha256_md5());
    let outcome = engine
        .execute_signing_process(&request, &NullLog, &NoProgress, &CancellationToken::new())
        .unwrap();

    assert_eq!(counts.file_signs.load(Ordering::SeqCst), 1);
    let sig = outcome.destination.join("distro.iso.sig");
    assert!(engine.verify_iso_signature(&fx.image, &sig, &NullLog).unwrap());
}
