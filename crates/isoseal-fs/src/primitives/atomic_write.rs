use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicWriteOptions {
    pub permissions: Option<u32>,
    pub sync:        bool,
}

impl AtomicWriteOptions {
    pub fn new() -> Self { Self::default() }

    /// Unix mode bits applied before the file becomes visible. Ignored elsewhere.
    pub fn permissions(mut self, mode: u32) -> Self {
        self.permissions = Some(mode);
        self
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

pub fn atomic_write(
    path: impl AsRef<Path>,
    content: &[u8],
    options: AtomicWriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    let parent = path.parent().ok_or_else(|| Error::NoParent {
        path: path.to_path_buf(),
    })?;

    let mut tmp_path = parent.to_path_buf();
    tmp_path.push(format!(".tmp.{}.isoseal", uuid::Uuid::new_v4()));

    let written = write_tmp(&tmp_path, content, options);
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Write {
            path:   tmp_path,
            source: e,
        });
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        Error::Write {
            path:   path.to_path_buf(),
            source: e,
        }
    })?;

    Ok(())
}

fn write_tmp(tmp_path: &Path, content: &[u8], options: AtomicWriteOptions) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp_path)?;
    file.write_all(content)?;

    #[cfg(unix)]
    if let Some(mode) = options.permissions {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(mode))?;
    }

    if options.sync {
        file.sync_all()?;
    }
    Ok(())
}

pub fn atomic_read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| Error::Read {
        path:   path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");
        atomic_write(&path, b"hello world", AtomicWriteOptions::new()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn test_atomic_write_replaces_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");
        fs::write(&path, "old").unwrap();

        atomic_write(&path, b"new", AtomicWriteOptions::new().sync(true)).unwrap();

        assert_eq!(atomic_read(&path).unwrap(), b"new");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("test.txt")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_write_with_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("secret.key");
        atomic_write(&path, b"data", AtomicWriteOptions::new().permissions(0o600)).unwrap();
        let metadata = fs::metadata(&path).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn test_atomic_write_missing_parent_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("file.txt");
        let err = atomic_write(&path, b"data", AtomicWriteOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }
}
