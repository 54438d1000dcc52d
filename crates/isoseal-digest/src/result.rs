use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AlgorithmSet, DigestAlgorithm};

/// Finalized lowercase hex digests, keyed by algorithm.
///
/// Only produced by finalizing a [`MultiHasher`](crate::MultiHasher), so its
/// keys are exactly the algorithms that were selected for the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DigestResult(BTreeMap<DigestAlgorithm, String>);

impl DigestResult {
    pub(crate) fn from_map(digests: BTreeMap<DigestAlgorithm, String>) -> Self { Self(digests) }

    pub fn get(&self, algorithm: DigestAlgorithm) -> Option<&str> {
        self.0.get(&algorithm).map(String::as_str)
    }

    /// Digests in canonical algorithm order.
    pub fn iter(&self) -> impl Iterator<Item = (DigestAlgorithm, &str)> {
        self.0.iter().map(|(alg, hex)| (*alg, hex.as_str()))
    }

    pub fn algorithms(&self) -> impl Iterator<Item = DigestAlgorithm> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// True when the result holds exactly the algorithms of `set`.
    pub fn covers_exactly(&self, set: &AlgorithmSet) -> bool {
        self.0.len() == set.len() && set.iter().all(|alg| self.0.contains_key(&alg))
    }

    /// `<hex>  <file_name>` line as written by coreutils `*sum` tools.
    pub fn checksum_line(&self, algorithm: DigestAlgorithm, file_name: &str) -> Option<String> {
        self.get(algorithm).map(|hex| format!("{hex}  {file_name}\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MultiHasher;

    #[test]
    fn test_checksum_line_format() {
        let set = AlgorithmSet::new([DigestAlgorithm::Md5]).unwrap();
        let mut hasher = MultiHasher::new(&set);
        hasher.update(b"abc");
        let result = hasher.finalize();

        assert_eq!(
            result.checksum_line(DigestAlgorithm::Md5, "disk.iso").unwrap(),
            "900150983cd24fb0d6963f7d28e17f72  disk.iso\n"
        );
        assert!(result.checksum_line(DigestAlgorithm::Sha1, "disk.iso").is_none());
    }

    #[test]
    fn test_covers_exactly() {
        let set = AlgorithmSet::new([DigestAlgorithm::Sha256, DigestAlgorithm::Md5]).unwrap();
        let result = MultiHasher::new(&set).finalize();

        assert!(result.covers_exactly(&set));
        assert!(!result.covers_exactly(&AlgorithmSet::default()));
        assert!(result.iter().all(|(alg, hex)| hex.len() == alg.hex_len()));
    }
}
