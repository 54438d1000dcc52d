use std::path::{Path, PathBuf};

use chrono::Utc;
use isoseal_digest::DigestResult;
use isoseal_fs::{DirLock, Workspace};
use isoseal_sign::SignatureArtifact;
use tracing::info;

use crate::report::{ReleaseReport, SignatureRef};
use crate::{EngineError, Result};

pub const REPORT_TEXT: &str = "report.txt";
pub const REPORT_JSON: &str = "report.json";

/// Writes release bundles under one output root.
///
/// A bundle is assembled in a hidden staging directory next to its
/// destination and swapped in whole, so the destination only ever holds a
/// complete bundle. An exclusive lock on the output root keeps two bundlers
/// from racing on it.
#[derive(Debug, Clone)]
pub struct ReleaseBundler {
    output_root: PathBuf,
}

impl ReleaseBundler {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// Canonical `<output_root>/<image stem>` for `image`, with a trailing
    /// `.iso` dropped.
    ///
    /// Fails with an input error when that destination is the image itself
    /// or a directory holding it, since committing a bundle there would move
    /// or delete the image.
    pub fn check_destination(&self, image: &Path) -> Result<PathBuf> {
        let name = image_name(image)?;
        self.resolve(image, &name).map(|resolved| resolved.destination)
    }

    pub fn bundle(
        &self,
        image: &Path,
        image_size: u64,
        digests: &DigestResult,
        signature: &SignatureArtifact,
    ) -> Result<ReleaseReport> {
        let name = image_name(image)?;
        let Resolved { root, destination, image_path } = self.resolve(image, &name)?;

        let _lock = DirLock::try_acquire(&root)?;
        let workspace = Workspace::beside(&destination)?;

        for (algorithm, _) in digests.iter() {
            if let Some(line) = digests.checksum_line(algorithm, &name) {
                workspace.write(format!("{name}.{}", algorithm.checksum_extension()), line.as_bytes())?;
            }
        }
        let signature_ref = SignatureRef::from_artifact(signature);
        workspace.import(&signature.path, &signature_ref.file_name)?;

        let report = ReleaseReport {
            image_path,
            image_name: name,
            image_size,
            digests: digests.clone(),
            signature: signature_ref,
            destination: destination.clone(),
            created_at: Utc::now(),
        };
        workspace.write(REPORT_TEXT, report.render().as_bytes())?;
        let json = report.to_json().map_err(|e| EngineError::Io {
            path:   workspace.path().join(REPORT_JSON),
            source: e.into(),
        })?;
        workspace.write(REPORT_JSON, json.as_bytes())?;

        workspace.commit()?;
        info!(destination = %destination.display(), files = digests.len() + 3, "bundle committed");
        Ok(report)
    }
}

struct Resolved {
    root:        PathBuf,
    destination: PathBuf,
    image_path:  PathBuf,
}

impl ReleaseBundler {
    fn resolve(&self, image: &Path, name: &str) -> Result<Resolved> {
        std::fs::create_dir_all(&self.output_root).map_err(|e| EngineError::Io {
            path:   self.output_root.clone(),
            source: e,
        })?;
        let root = std::fs::canonicalize(&self.output_root).map_err(|e| EngineError::Io {
            path:   self.output_root.clone(),
            source: e,
        })?;
        let image_path =
            std::fs::canonicalize(image).map_err(|e| EngineError::input(image, e.to_string()))?;
        let destination = root.join(bundle_stem(name));

        // An existing destination may be a symlink into the image's directory.
        let linked = std::fs::canonicalize(&destination).unwrap_or_else(|_| destination.clone());
        if image_path.starts_with(&destination) || image_path.starts_with(&linked) {
            return Err(EngineError::input(
                image,
                format!("bundle destination '{}' would overwrite the image", destination.display()),
            ));
        }

        Ok(Resolved {
            root,
            destination,
            image_path,
        })
    }
}

fn image_name(image: &Path) -> Result<String> {
    image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| EngineError::input(image, "image path has no file name"))
}

fn bundle_stem(name: &str) -> &str {
    let cut = name.len().saturating_sub(4);
    match name.get(cut..) {
        Some(ext) if cut > 0 && ext.eq_ignore_ascii_case(".iso") => &name[..cut],
        _ => name,
    }
}
