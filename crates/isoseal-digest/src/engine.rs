use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use tracing::{debug, info};

use crate::progress::{ProgressRange, ProgressSink, ProgressTracker};
use crate::{AlgorithmSet, CancellationToken, DigestError, DigestResult, MultiHasher, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;
pub const MIN_CHUNK_SIZE: usize = 64 * 1024;
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Outcome of one digest pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestOutput {
    pub result: DigestResult,
    /// Bytes actually consumed from the source.
    pub bytes:  u64,
}

/// Single-pass streaming digester.
///
/// Every chunk read from the source updates every selected accumulator before
/// the next chunk is read, so I/O is bounded by the source size regardless of
/// how many algorithms are selected.
#[derive(Debug, Clone, Copy)]
pub struct DigestEngine {
    chunk_size: usize,
    parallel:   bool,
}

impl Default for DigestEngine {
    fn default() -> Self { Self::new() }
}

impl DigestEngine {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallel:   false,
        }
    }

    /// Chunk size, clamped to `MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE`.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn get_chunk_size(&self) -> usize { self.chunk_size }

    /// Digest the file at `path` with every algorithm in `algorithms`.
    pub fn digest(
        &self,
        path: &Path,
        algorithms: &AlgorithmSet,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<DigestOutput> {
        self.digest_with(path, algorithms, &mut |_| {}, progress, cancel)
    }

    /// Like [`digest`](Self::digest), also handing every chunk to `observer`
    /// in order, so other consumers of the image share the single read.
    pub fn digest_with(
        &self,
        path: &Path,
        algorithms: &AlgorithmSet,
        observer: &mut dyn FnMut(&[u8]),
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<DigestOutput> {
        let file = File::open(path).map_err(|e| DigestError::Open {
            path:   path.to_path_buf(),
            source: e,
        })?;
        let metadata = file.metadata().map_err(|e| DigestError::Open {
            path:   path.to_path_buf(),
            source: e,
        })?;
        if !metadata.is_file() {
            return Err(DigestError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        info!(path = %path.display(), size = metadata.len(), algorithms = algorithms.len(), "digesting");
        self.pass(file, metadata.len(), path, algorithms, observer, progress, cancel)
    }

    /// Same pass over an arbitrary reader of `total` expected bytes.
    ///
    /// `label` only names the source in errors.
    pub fn digest_reader<R: Read>(
        &self,
        reader: R,
        total: u64,
        label: &Path,
        algorithms: &AlgorithmSet,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<DigestOutput> {
        self.pass(reader, total, label, algorithms, &mut |_| {}, progress, cancel)
    }

    #[allow(clippy::too_many_arguments)]
    fn pass<R: Read>(
        &self,
        mut reader: R,
        total: u64,
        label: &Path,
        algorithms: &AlgorithmSet,
        observer: &mut dyn FnMut(&[u8]),
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<DigestOutput> {
        let tracker = ProgressTracker::new(progress);
        let mut hasher = MultiHasher::new(algorithms).parallel(self.parallel);
        let mut buffer = vec![0u8; self.chunk_size];
        let mut offset = 0u64;

        tracker.report(0);
        loop {
            if cancel.is_cancelled() {
                debug!(offset, "digest cancelled");
                return Err(DigestError::Cancelled { offset });
            }

            let filled = fill_chunk(&mut reader, &mut buffer).map_err(|(partial, e)| DigestError::Read {
                path:   label.to_path_buf(),
                offset: offset + partial as u64,
                source: e,
            })?;
            if filled == 0 {
                break;
            }

            let chunk = &buffer[..filled];
            hasher.update(chunk);
            observer(chunk);
            offset += filled as u64;
            tracker.report(ProgressRange::FULL.fraction(offset, total));

            if filled < buffer.len() {
                break;
            }
        }

        let result = hasher.finalize();
        tracker.finish();
        debug!(bytes = offset, "digest complete");

        Ok(DigestOutput {
            result,
            bytes: offset,
        })
    }
}

/// Read until `buf` is full or the source is exhausted.
///
/// On failure, also returns how many bytes of `buf` were filled first.
fn fill_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::result::Result<usize, (usize, std::io::Error)> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err((filled, e)),
        }
    }
    Ok(filled)
}
