use std::io;
use std::path::PathBuf;

use isoseal_digest::DigestError;
use isoseal_sign::SignError;

use crate::JobState;

/// Coarse failure classes a caller can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad arguments or unreadable inputs; nothing was written.
    Input,
    /// Read or write failure after work started.
    Io,
    /// No usable key, or the signer refused.
    Crypto,
    /// Signing backend missing or misconfigured.
    Environment,
    /// Another job holds the engine or the output directory.
    Busy,
    Cancelled,
    /// A bug in job sequencing.
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("'{path}': {reason}")]
    Input { path: PathBuf, reason: String },

    #[error("no digest algorithms selected")]
    NoAlgorithms,

    #[error(transparent)]
    Digest(#[from] DigestError),

    #[error(transparent)]
    Sign(#[from] SignError),

    #[error(transparent)]
    Fs(#[from] isoseal_fs::Error),

    #[error("i/o error on '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("'{path}' changed while it was being signed ({hashed} bytes hashed, {signed} bytes signed)")]
    ImageChanged { path: PathBuf, hashed: u64, signed: u64 },

    #[error("a {0} job is already running")]
    Busy(&'static str),

    #[error("job cancelled")]
    Cancelled,

    #[error("invalid job transition {from} -> {to}")]
    InvalidTransition { from: JobState, to: JobState },

    #[error("failed to read config '{path}': {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("invalid config '{path}': {source}")]
    ConfigParse { path: PathBuf, source: toml::de::Error },

    #[error("failed to start worker thread: {0}")]
    Worker(io::Error),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input { .. } | Self::NoAlgorithms | Self::ConfigRead { .. } | Self::ConfigParse { .. } => {
                ErrorKind::Input
            }
            Self::Digest(e) => match e {
                DigestError::Read { .. } => ErrorKind::Io,
                DigestError::Cancelled { .. } => ErrorKind::Cancelled,
                _ => ErrorKind::Input,
            },
            Self::Sign(e) => match e {
                SignError::KeyUnavailable { .. } | SignError::Crypto(_) => ErrorKind::Crypto,
                SignError::Environment { .. } => ErrorKind::Environment,
                SignError::Input { .. } => ErrorKind::Input,
                SignError::Output { .. } | SignError::Fs(_) => ErrorKind::Io,
            },
            Self::Fs(isoseal_fs::Error::Locked { .. }) => ErrorKind::Busy,
            Self::Fs(_) | Self::Io { .. } | Self::ImageChanged { .. } => ErrorKind::Io,
            Self::Busy(_) => ErrorKind::Busy,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidTransition { .. } => ErrorKind::Internal,
            Self::Worker(_) => ErrorKind::Environment,
        }
    }

    pub(crate) fn input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Input {
            path:   path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
