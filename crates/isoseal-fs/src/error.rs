use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to replace directory '{path}': {source}")]
    ReplaceDir { path: PathBuf, source: io::Error },

    #[error("'{path}' has no parent directory")]
    NoParent { path: PathBuf },

    #[error("'{path}' is locked by another operation")]
    Locked { path: PathBuf },
}

impl Error {
    /// Path the failing operation was working on.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::ReplaceDir { path, .. }
            | Self::NoParent { path }
            | Self::Locked { path } => path,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
