use crate::primitives::replace_dir::sibling;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

use tracing::debug;

/// Staging directory for a directory that must appear all at once.
///
/// Files are assembled under a hidden sibling of the destination and the
/// whole directory is swapped into place by [`commit`](Self::commit). A
/// workspace dropped without committing removes its staging directory and
/// leaves the destination untouched.
pub struct Workspace {
    staging_path:     PathBuf,
    destination_path: PathBuf,
    committed:        bool,
}

impl Workspace {
    pub fn new(staging_dir: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<Self> {
        let staging_path = staging_dir.as_ref().to_path_buf();
        let destination_path = destination.as_ref().to_path_buf();

        std::fs::create_dir_all(&staging_path).map_err(|e| Error::Write {
            path:   staging_path.clone(),
            source: e,
        })?;

        debug!(staging = %staging_path.display(), "workspace created");
        Ok(Self {
            staging_path,
            destination_path,
            committed: false,
        })
    }

    /// Workspace staged next to `destination`, so the final swap is a
    /// same-filesystem rename.
    pub fn beside(destination: impl AsRef<Path>) -> Result<Self> {
        let destination = destination.as_ref();
        if destination.parent().is_none() || destination.file_name().is_none() {
            return Err(Error::NoParent {
                path: destination.to_path_buf(),
            });
        }
        Self::new(sibling(destination, "staging"), destination)
    }

    pub fn path(&self) -> &Path { &self.staging_path }

    pub fn destination(&self) -> &Path { &self.destination_path }

    /// Write `content` to `name` inside the staging directory.
    pub fn write(&self, name: impl AsRef<Path>, content: &[u8]) -> Result<PathBuf> {
        let path = self.staging_path.join(name);
        std::fs::write(&path, content).map_err(|e| Error::Write {
            path:   path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Bring an existing file into the staging directory as `name`.
    pub fn import(&self, src: impl AsRef<Path>, name: impl AsRef<Path>) -> Result<PathBuf> {
        let path = self.staging_path.join(name);
        crate::hardlink_or_copy(src, &path)?;
        Ok(path)
    }

    /// Swap the staged directory into place, replacing any previous one.
    pub fn commit(mut self) -> Result<PathBuf> {
        crate::replace_dir(&self.staging_path, &self.destination_path, Default::default())?;
        self.committed = true;
        debug!(destination = %self.destination_path.display(), "workspace committed");
        Ok(self.destination_path.clone())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_dir_all(&self.staging_path);
        }
    }
}
