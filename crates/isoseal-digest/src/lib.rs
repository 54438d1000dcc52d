//! Single-pass, multi-algorithm digests for disk images.
//!
//! A disk image is read exactly once, in fixed-size chunks; every chunk is fed
//! to all selected accumulators before the next one is read. Progress is
//! pushed to a [`ProgressSink`] as whole, non-decreasing percentages and the
//! pass can be abandoned between chunks through a [`CancellationToken`].
//!
//! # Example
//!
//! ```
//! use isoseal_digest::{AlgorithmSet, CancellationToken, DigestAlgorithm, DigestEngine, NoProgress};
//! use std::io::Cursor;
//! use std::path::Path;
//!
//! let set = AlgorithmSet::parse(["sha256", "md5"]).unwrap();
//! let out = DigestEngine::new()
//!     .digest_reader(
//!         Cursor::new(b"abc"),
//!         3,
//!         Path::new("abc"),
//!         &set,
//!         &NoProgress,
//!         &CancellationToken::new(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(out.result.get(DigestAlgorithm::Md5), Some("900150983cd24fb0d6963f7d28e17f72"));
//! ```

pub use self::algorithm::{AlgorithmSet, DigestAlgorithm};
pub use self::cancel::CancellationToken;
pub use self::engine::{
    DEFAULT_CHUNK_SIZE, DigestEngine, DigestOutput, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE,
};
pub use self::error::{DigestError, Result};
pub use self::hasher::{DigestHasher, Hasher, MultiHasher};
pub use self::progress::{
    NoProgress, ProgressRange, ProgressSink, ProgressTracker, ScaledProgress,
};
pub use self::result::DigestResult;

mod algorithm;
mod cancel;
mod engine;
mod error;
mod hasher;
pub mod progress;
mod result;
