use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("no usable signing key for '{identity}': {detail}")]
    KeyUnavailable { identity: String, detail: String },

    #[error("signing failed: {0}")]
    Crypto(String),

    #[error("{backend} backend unavailable: {detail}")]
    Environment {
        backend: &'static str,
        detail:  String,
    },

    #[error("cannot read '{path}': {source}")]
    Input { path: PathBuf, source: io::Error },

    #[error("failed to write signature '{path}': {source}")]
    Output { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Fs(#[from] isoseal_fs::Error),
}

pub type Result<T> = std::result::Result<T, SignError>;
