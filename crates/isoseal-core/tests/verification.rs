use std::fs;
use std::io::Write;
use std::path::PathBuf;

use isoseal_core::{
    AlgorithmSet, CancellationToken, CollectingSink, Engine, EngineConfig, ErrorKind, NoProgress, NullLog,
    SignatureManager, SigningRequest,
};
use isoseal_sign::KeyringBackend;
use tempfile::{TempDir, tempdir};

const ID: &str = "verifier-test";

/// Signs a 1 KiB image and returns the engine, image and signature paths.
fn signed_image() -> (TempDir, Engine, PathBuf, PathBuf) {
    let dir = tempdir().unwrap();
    let keys = dir.path().join("keys");
    KeyringBackend::generate_key(&keys, ID, [1u8; 32]).unwrap();
    let engine = Engine::new(
        EngineConfig::default(),
        SignatureManager::new(KeyringBackend::new(keys)).identity(ID),
    );

    let image = dir.path().join("small.iso");
    fs::write(&image, [0x5au8; 1024]).unwrap();
    let request = SigningRequest::new(&image, dir.path().join("out"), AlgorithmSet::default());
    let outcome = engine
        .execute_signing_process(&request, &NullLog, &NoProgress, &CancellationToken::new())
        .unwrap();
    let signature = outcome.destination.join("small.iso.sig");
    (dir, engine, image, signature)
}

#[test]
fn test_unmodified_image_verifies() {
    let (_dir, engine, image, signature) = signed_image();
    let log = CollectingSink::new();

    assert!(engine.verify_iso_signature(&image, &signature, &log).unwrap());

    let lines = log.lines();
    assert_eq!(lines[0], "[VERIFYING]");
    assert!(lines.iter().any(|l| l == &format!("Signer: {ID}")));
    assert_eq!(lines.last().unwrap(), "[PASSED]");
}

#[test]
fn test_appended_byte_fails_verification() {
    let (_dir, engine, image, signature) = signed_image();
    fs::OpenOptions::new()
        .append(true)
        .open(&image)
        .unwrap()
        .write_all(&[0])
        .unwrap();

    let log = CollectingSink::new();
    assert!(!engine.verify_iso_signature(&image, &signature, &log).unwrap());
    assert_eq!(log.lines().last().unwrap(), "[REJECTED]");
}

#[test]
fn test_flipped_byte_fails_verification() {
    let (_dir, engine, image, signature) = signed_image();
    let mut bytes = fs::read(&image).unwrap();
    bytes[0] ^= 0x80;
    fs::write(&image, bytes).unwrap();

    assert!(!engine.verify_iso_signature(&image, &signature, &NullLog).unwrap());
}

#[test]
fn test_truncated_signature_is_false_with_diagnostic() {
    let (dir, engine, image, signature) = signed_image();
    let text = fs::read_to_string(&signature).unwrap();
    let truncated = dir.path().join("truncated.sig");
    fs::write(&truncated, &text[..40]).unwrap();

    let log = CollectingSink::new();
    assert!(!engine.verify_iso_signature(&image, &truncated, &log).unwrap());
    assert!(log.lines().iter().any(|l| l.contains("malformed or truncated")));
}

#[test]
fn test_random_bytes_as_signature_is_false() {
    let (dir, engine, image, _) = signed_image();
    let garbage = dir.path().join("garbage.sig");
    fs::write(&garbage, (0..=255u8).collect::<Vec<_>>()).unwrap();

    assert!(!engine.verify_iso_signature(&image, &garbage, &NullLog).unwrap());
}

#[test]
fn test_missing_signature_file_is_input_error() {
    let (dir, engine, image, _) = signed_image();
    let log = CollectingSink::new();
    let err = engine
        .verify_iso_signature(&image, &dir.path().join("absent.sig"), &log)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(log.lines().iter().any(|l| l.starts_with("Cannot determine authenticity")));
}

#[test]
fn test_missing_keyring_is_environment_error() {
    let (dir, _engine, image, signature) = signed_image();
    let engine = Engine::new(
        EngineConfig::default(),
        SignatureManager::new(KeyringBackend::new(dir.path().join("no-such-keyring"))),
    );
    let err = engine.verify_iso_signature(&image, &signature, &NullLog).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Environment);
}
