use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hasher::{DigestHasher, Hasher};
use crate::{DigestError, Result};

/// Hash functions an image can be digested with.
///
/// The declaration order is the canonical order used whenever digests are
/// listed (reports, manifests, CLI output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
    Sha3_512,
    Blake2b,
    Sha1,
    Md5,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 6] = [
        Self::Sha256,
        Self::Sha512,
        Self::Sha3_512,
        Self::Blake2b,
        Self::Sha1,
        Self::Md5,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Sha3_512 => "sha3-512",
            Self::Blake2b => "blake2b",
        }
    }

    /// Human label, e.g. `SHA3-512`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
            Self::Sha3_512 => "SHA3-512",
            Self::Blake2b => "BLAKE2b",
        }
    }

    pub fn digest_length(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 | Self::Sha3_512 | Self::Blake2b => 64,
        }
    }

    /// Length of the lowercase hex encoding.
    pub fn hex_len(&self) -> usize { self.digest_length() * 2 }

    /// Suffix of the per-algorithm checksum file written into a bundle.
    pub fn checksum_extension(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Sha3_512 => "sha3-512",
            Self::Blake2b => "b2",
        }
    }

    /// Fresh accumulator for this algorithm.
    pub fn hasher(&self) -> Box<dyn Hasher> {
        match self {
            Self::Md5 => Box::new(DigestHasher::<md5::Md5>::new()),
            Self::Sha1 => Box::new(DigestHasher::<sha1::Sha1>::new()),
            Self::Sha256 => Box::new(DigestHasher::<sha2::Sha256>::new()),
            Self::Sha512 => Box::new(DigestHasher::<sha2::Sha512>::new()),
            Self::Sha3_512 => Box::new(DigestHasher::<sha3::Sha3_512>::new()),
            Self::Blake2b => Box::new(DigestHasher::<blake2::Blake2b512>::new()),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

impl FromStr for DigestAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            "sha3512" => Ok(Self::Sha3_512),
            "blake2b" | "blake2b512" | "b2" => Ok(Self::Blake2b),
            _ => Err(DigestError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl Serialize for DigestAlgorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DigestAlgorithm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Non-empty, de-duplicated selection of algorithms for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmSet(BTreeSet<DigestAlgorithm>);

impl AlgorithmSet {
    pub fn new(algorithms: impl IntoIterator<Item = DigestAlgorithm>) -> Result<Self> {
        let set: BTreeSet<_> = algorithms.into_iter().collect();
        if set.is_empty() {
            return Err(DigestError::EmptySelection);
        }
        Ok(Self(set))
    }

    /// Parse identifiers such as `["SHA256", "md5"]`.
    pub fn parse<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let algorithms = names
            .into_iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<DigestAlgorithm>>>()?;
        Self::new(algorithms)
    }

    pub fn contains(&self, algorithm: DigestAlgorithm) -> bool { self.0.contains(&algorithm) }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = DigestAlgorithm> + '_ { self.0.iter().copied() }
}

impl Default for AlgorithmSet {
    fn default() -> Self { Self(BTreeSet::from([DigestAlgorithm::Sha256])) }
}
