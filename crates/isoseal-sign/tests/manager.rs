use std::fs;
use std::path::{Path, PathBuf};

use isoseal_sign::{KeyringBackend, SignError, SignatureManager};
use tempfile::{TempDir, tempdir};

const ID: &str = "builder@example.org";

fn setup(content: &[u8]) -> (TempDir, SignatureManager, PathBuf) {
    let dir = tempdir().unwrap();
    let keys = dir.path().join("keys");
    KeyringBackend::generate_key(&keys, ID, [11u8; 32]).unwrap();
    let iso = dir.path().join("distro.iso");
    fs::write(&iso, content).unwrap();
    let manager = SignatureManager::new(KeyringBackend::new(keys)).identity(ID);
    (dir, manager, iso)
}

fn sig_path(dir: &Path) -> PathBuf { dir.join("distro.iso.sig") }

#[test]
fn test_sign_and_verify_roundtrip() {
    let (dir, manager, iso) = setup(&vec![3u8; 1024]);
    let artifact = manager.sign(&iso, &sig_path(dir.path())).unwrap();

    assert_eq!(artifact.identity, ID);
    assert_eq!(artifact.file_name(), "distro.iso.sig");
    assert_eq!(manager.signature_extension(), "sig");

    let outcome = manager.verify(&iso, &artifact.path).unwrap();
    assert!(outcome.authentic);
    assert!(outcome.lines.iter().any(|l| l.contains("Good signature")));
}

#[test]
fn test_flipped_byte_is_rejected() {
    let (dir, manager, iso) = setup(&vec![3u8; 4096]);
    let sig = sig_path(dir.path());
    manager.sign(&iso, &sig).unwrap();

    let mut content = fs::read(&iso).unwrap();
    content[2000] ^= 0x01;
    fs::write(&iso, content).unwrap();

    let outcome = manager.verify(&iso, &sig).unwrap();
    assert!(!outcome.authentic);
    assert!(outcome.lines[0].starts_with("BAD signature"));
}

#[test]
fn test_truncated_signature_is_rejected_not_an_error() {
    let (dir, manager, iso) = setup(b"payload");
    let sig = sig_path(dir.path());
    manager.sign(&iso, &sig).unwrap();

    let text = fs::read_to_string(&sig).unwrap();
    fs::write(&sig, &text[..text.len() / 2]).unwrap();

    let outcome = manager.verify(&iso, &sig).unwrap();
    assert!(!outcome.authentic);
    assert!(!outcome.lines.is_empty());
}

#[test]
fn test_signature_from_another_image_is_rejected() {
    let (dir, manager, iso) = setup(b"first image");
    let other = dir.path().join("other.iso");
    fs::write(&other, b"second image").unwrap();
    let sig = dir.path().join("other.iso.sig");
    manager.sign(&other, &sig).unwrap();

    assert!(!manager.verify(&iso, &sig).unwrap().authentic);
}

#[test]
fn test_missing_inputs_are_input_errors() {
    let (dir, manager, iso) = setup(b"x");
    let sig = sig_path(dir.path());

    assert!(matches!(
        manager.sign(&dir.path().join("absent.iso"), &sig),
        Err(SignError::Input { .. })
    ));
    assert!(matches!(manager.verify(&iso, &sig), Err(SignError::Input { .. })));
}

#[test]
fn test_without_identity_is_key_unavailable() {
    let dir = tempdir().unwrap();
    let iso = dir.path().join("distro.iso");
    fs::write(&iso, b"x").unwrap();
    let manager = SignatureManager::new(KeyringBackend::new(dir.path()));

    assert!(manager.default_identity().is_none());
    assert!(matches!(
        manager.sign(&iso, &sig_path(dir.path())),
        Err(SignError::KeyUnavailable { .. })
    ));
}
