use crate::{Error, Result};
use std::io;
use std::path::Path;

/// Link `src` at `dest`, copying instead when the two sit on different devices.
///
/// Used to pull artifacts produced elsewhere into a staging directory without
/// duplicating large files when it can be avoided.
pub fn hardlink_or_copy(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    match std::fs::hard_link(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) || e.kind() == io::ErrorKind::Unsupported => {
            std::fs::copy(src, dest).map(drop).map_err(|e| Error::Write {
                path:   dest.to_path_buf(),
                source: e,
            })
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound && !src.exists() => Err(Error::Read {
            path:   src.to_path_buf(),
            source: e,
        }),
        Err(e) => Err(Error::Write {
            path:   dest.to_path_buf(),
            source: e,
        }),
    }
}

fn is_cross_device(e: &io::Error) -> bool {
    // EXDEV
    e.kind() == io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18)
}
