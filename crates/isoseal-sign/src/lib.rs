//! Detached signatures for release images.
//!
//! A [`SignatureManager`] wraps one [`SigningBackend`]:
//!
//! - [`GpgBackend`] drives an installed GnuPG through a [`CommandRunner`].
//! - [`KeyringBackend`] signs with Ed25519 keys kept in a local directory and
//!   needs no external tools.
//!
//! ```no_run
//! use std::path::Path;
//! use isoseal_sign::{KeyringBackend, SignatureManager};
//!
//! let manager = SignatureManager::new(KeyringBackend::new("/etc/isoseal/keys")).identity("release");
//! let artifact = manager.sign(Path::new("distro.iso"), Path::new("distro.iso.sig"))?;
//! let outcome = manager.verify(&artifact.target, &artifact.path)?;
//! assert!(outcome.authentic);
//! # Ok::<(), isoseal_sign::SignError>(())
//! ```

pub mod armor;
mod backend;
pub mod command;
mod error;
mod gpg;
mod keyring;
mod manager;

pub use backend::{SignatureArtifact, SigningBackend, StreamSigner, VerificationOutcome};
pub use command::{Command, CommandOutput, CommandRunner, SystemRunner};
pub use error::{Result, SignError};
pub use gpg::GpgBackend;
pub use keyring::{KeyringBackend, fingerprint};
pub use manager::SignatureManager;
