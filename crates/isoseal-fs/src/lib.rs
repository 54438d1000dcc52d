//! Atomic filesystem primitives for release bundles.
//!
//! - [`atomic_write`]: write-to-temp then rename, never exposing a torn file
//! - [`replace_dir`]: swap a fully built directory into place
//! - [`Workspace`]: staging directory that is either committed whole or removed
//! - [`DirLock`]: advisory exclusive lock serializing writers of one directory

mod error;
mod lock;
pub mod primitives;
pub mod workflow;

pub use error::{Error, Result};
pub use lock::{DirLock, LOCK_FILE_NAME};
pub use primitives::{
    AtomicWriteOptions, ReplaceDirOptions, atomic_read, atomic_write, hardlink_or_copy, replace_dir,
};
pub use workflow::Workspace;
