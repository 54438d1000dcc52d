use crate::{Error, Result};
use fs2::FileExt;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;

pub const LOCK_FILE_NAME: &str = ".isoseal.lock";

/// Advisory exclusive lock on a directory, held until dropped.
///
/// Backed by `flock`-style locks on a marker file, so it serializes writers
/// across processes as well as across handles within one process.
pub struct DirLock {
    file: File,
    path: PathBuf,
}

impl DirLock {
    fn open(path: &Path) -> Result<File> {
        File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::Write {
                path:   path.to_path_buf(),
                source: e,
            })
    }

    /// Take the lock, failing with [`Error::Locked`] instead of waiting.
    pub fn try_acquire(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(LOCK_FILE_NAME);
        let file = Self::open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(path = %path.display(), "lock acquired");
                Ok(Self { file, path })
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Err(Error::Locked { path }),
            Err(e) => Err(Error::Write { path, source: e }),
        }
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
