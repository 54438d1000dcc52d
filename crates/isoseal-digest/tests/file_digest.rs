use std::sync::Mutex;

use digest::Digest;
use isoseal_digest::{
    AlgorithmSet, CancellationToken, DigestAlgorithm, DigestEngine, DigestError, NoProgress,
};

fn synthetic_image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) ^ (i >> 7)) as u8).collect()
}

fn reference(algorithm: DigestAlgorithm, data: &[u8]) -> String {
    match algorithm {
        DigestAlgorithm::Md5 => hex::encode(md5::Md5::digest(data)),
        DigestAlgorithm::Sha1 => hex::encode(sha1::Sha1::digest(data)),
        DigestAlgorithm::Sha256 => hex::encode(sha2::Sha256::digest(data)),
        DigestAlgorithm::Sha512 => hex::encode(sha2::Sha512::digest(data)),
        DigestAlgorithm::Sha3_512 => hex::encode(sha3::Sha3_512::digest(data)),
        DigestAlgorithm::Blake2b => hex::encode(blake2::Blake2b512::digest(data)),
    }
}

#[test]
fn test_every_algorithm_matches_reference() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.iso");
    let data = synthetic_image(300_000);
    std::fs::write(&path, &data).unwrap();

    let set = AlgorithmSet::new(DigestAlgorithm::ALL).unwrap();
    let out = DigestEngine::new()
        .chunk_size(64 * 1024)
        .parallel(true)
        .digest(&path, &set, &NoProgress, &CancellationToken::new())
        .unwrap();

    assert_eq!(out.bytes, data.len() as u64);
    assert!(out.result.covers_exactly(&set));
    for algorithm in DigestAlgorithm::ALL {
        assert_eq!(
            out.result.get(algorithm).unwrap(),
            reference(algorithm, &data),
            "{algorithm}"
        );
    }
}

#[test]
fn test_superset_selection_keeps_individual_results() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.iso");
    std::fs::write(&path, synthetic_image(150_001)).unwrap();

    let engine = DigestEngine::new().chunk_size(64 * 1024);
    let small = AlgorithmSet::parse(["sha256", "md5"]).unwrap();
    let large = AlgorithmSet::new(DigestAlgorithm::ALL).unwrap();

    let a = engine.digest(&path, &small, &NoProgress, &CancellationToken::new()).unwrap();
    let b = engine.digest(&path, &large, &NoProgress, &CancellationToken::new()).unwrap();

    assert_eq!(a.result.len(), 2);
    for algorithm in small.iter() {
        assert_eq!(a.result.get(algorithm), b.result.get(algorithm));
    }
}

#[test]
fn test_progress_is_monotonic_and_ends_at_hundred() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.iso");
    std::fs::write(&path, synthetic_image(1024 * 1024 + 17)).unwrap();

    let seen = Mutex::new(Vec::new());
    let sink = |p: u8| seen.lock().unwrap().push(p);
    DigestEngine::new()
        .chunk_size(64 * 1024)
        .digest(&path, &AlgorithmSet::default(), &sink, &CancellationToken::new())
        .unwrap();

    let seen = seen.into_inner().unwrap();
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&100));
    assert_eq!(seen.iter().filter(|p| **p == 100).count(), 1);
}

#[test]
fn test_missing_file_is_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = DigestEngine::new()
        .digest(
            &dir.path().join("absent.iso"),
            &AlgorithmSet::default(),
            &NoProgress,
            &CancellationToken::new(),
        )
        .unwrap_err();
    assert!(matches!(err, DigestError::Open { .. }));
}

#[test]
fn test_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = DigestEngine::new()
        .digest(dir.path(), &AlgorithmSet::default(), &NoProgress, &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, DigestError::NotAFile { .. }));
}
