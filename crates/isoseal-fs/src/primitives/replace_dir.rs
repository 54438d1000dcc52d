use crate::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

#[derive(Clone, Copy, Debug)]
pub struct ReplaceDirOptions {
    retry_count: u32,
    retry_delay: Duration,
}

impl Default for ReplaceDirOptions {
    fn default() -> Self {
        Self {
            retry_count: 5,
            retry_delay: Duration::from_millis(100),
        }
    }
}

impl ReplaceDirOptions {
    pub fn new() -> Self { Self::default() }
}

/// Move the fully populated directory `src` to `dest`.
///
/// An existing `dest` is replaced as a whole: afterwards `dest` holds exactly
/// the contents of `src`, never a merge. If the swap fails the previous `dest`
/// is left (or put back) in place and `src` is kept for the caller to discard.
pub fn replace_dir(src: impl AsRef<Path>, dest: impl AsRef<Path>, options: ReplaceDirOptions) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();
    let fail = |source: io::Error| Error::ReplaceDir {
        path: dest.to_path_buf(),
        source,
    };

    match std::fs::symlink_metadata(dest) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return rename_with_retry(src, dest, options).map_err(fail);
        }
        Err(e) => return Err(fail(e)),
        Ok(meta) if !meta.is_dir() => {
            return Err(fail(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "destination exists and is not a directory",
            )));
        }
        Ok(_) => {}
    }

    #[cfg(target_os = "linux")]
    {
        match exchange(src, dest) {
            Ok(()) => {
                debug!(dest = %dest.display(), "exchanged directories");
                discard(src);
                return Ok(());
            }
            Err(e) => debug!(error = %e, "atomic exchange unavailable, falling back to backup rename"),
        }
    }

    let backup = sibling(dest, "old");
    rename_with_retry(dest, &backup, options).map_err(fail)?;

    if let Err(e) = rename_with_retry(src, dest, options) {
        if let Err(restore) = std::fs::rename(&backup, dest) {
            warn!(
                backup = %backup.display(),
                error = %restore,
                "failed to restore previous directory"
            );
        }
        return Err(fail(e));
    }

    discard(&backup);
    Ok(())
}

/// Hidden sibling of `path` with a unique name, e.g. `.name.<uuid>.tag`.
pub(crate) fn sibling(path: &Path, tag: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.{tag}", uuid::Uuid::new_v4()))
}

#[cfg(target_os = "linux")]
fn exchange(a: &Path, b: &Path) -> io::Result<()> {
    use rustix::fs::{CWD, RenameFlags, renameat_with};

    renameat_with(CWD, a, CWD, b, RenameFlags::EXCHANGE).map_err(io::Error::from)
}

fn rename_with_retry(src: &Path, dest: &Path, options: ReplaceDirOptions) -> io::Result<()> {
    let mut attempts = 0;
    loop {
        match std::fs::rename(src, dest) {
            Ok(()) => return Ok(()),
            Err(e) => {
                attempts += 1;
                if attempts >= options.retry_count || !is_transient(&e) {
                    return Err(e);
                }
                thread::sleep(options.retry_delay * attempts);
            }
        }
    }
}

// Sharing violations from scanners and indexers are the usual culprits on Windows.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::ResourceBusy | io::ErrorKind::Interrupted
    )
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_dir_all(path) {
        warn!(path = %path.display(), error = %e, "failed to remove replaced directory");
    }
}
