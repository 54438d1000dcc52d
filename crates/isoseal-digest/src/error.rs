use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("no digest algorithm selected")]
    EmptySelection,

    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("failed to open '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("'{path}' is not a regular file")]
    NotAFile { path: PathBuf },

    #[error("read failed on '{path}' at offset {offset}: {source}")]
    Read {
        path:   PathBuf,
        offset: u64,
        source: io::Error,
    },

    #[error("digest cancelled at offset {offset}")]
    Cancelled { offset: u64 },
}

impl DigestError {
    /// Offset reached before the stream was abandoned, if any bytes were consumed.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::Read { offset, .. } | Self::Cancelled { offset } => Some(*offset),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DigestError>;
