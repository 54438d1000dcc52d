use std::collections::BTreeMap;

use digest::Digest;

use crate::{AlgorithmSet, DigestAlgorithm, DigestResult};

/// Incremental hash accumulator.
///
/// Object safe so a job can hold a heterogeneous set of accumulators.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

/// Adapts any RustCrypto [`Digest`] to [`Hasher`].
pub struct DigestHasher<D: Digest + Send>(D);

impl<D: Digest + Send> DigestHasher<D> {
    pub fn new() -> Self { Self(D::new()) }
}

impl<D: Digest + Send> Default for DigestHasher<D> {
    fn default() -> Self { Self::new() }
}

impl<D: Digest + Send> Hasher for DigestHasher<D> {
    fn update(&mut self, data: &[u8]) { Digest::update(&mut self.0, data); }

    fn finalize(self: Box<Self>) -> Vec<u8> { self.0.finalize().to_vec() }
}

/// One accumulator per selected algorithm, all fed from the same chunk.
pub struct MultiHasher {
    hashers:  Vec<(DigestAlgorithm, Box<dyn Hasher>)>,
    parallel: bool,
}

impl MultiHasher {
    pub fn new(algorithms: &AlgorithmSet) -> Self {
        Self {
            hashers:  algorithms.iter().map(|alg| (alg, alg.hasher())).collect(),
            parallel: false,
        }
    }

    /// Fan each chunk out to scoped threads, joining before returning.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn update(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }

        if self.parallel && self.hashers.len() > 1 {
            std::thread::scope(|scope| {
                for (_, hasher) in self.hashers.iter_mut() {
                    scope.spawn(move || hasher.update(chunk));
                }
            });
        } else {
            for (_, hasher) in self.hashers.iter_mut() {
                hasher.update(chunk);
            }
        }
    }

    pub fn finalize(self) -> DigestResult {
        let digests: BTreeMap<_, _> = self
            .hashers
            .into_iter()
            .map(|(alg, hasher)| (alg, hex::encode(hasher.finalize())))
            .collect();
        DigestResult::from_map(digests)
    }
}
