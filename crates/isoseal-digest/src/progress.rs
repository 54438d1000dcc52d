//! Percent-based progress reporting.
//!
//! Listeners only ever observe a non-decreasing sequence of whole percent
//! values in `0..=100`, and `100` is delivered once, by [`ProgressTracker::finish`].

use std::sync::Mutex;
use std::sync::mpsc::Sender;

/// Push-only consumer of progress percentages.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(u8) + Send + Sync,
{
    fn report(&self, percent: u8) { self(percent) }
}

/// Values sent after the receiver hung up are dropped.
impl ProgressSink for Sender<u8> {
    fn report(&self, percent: u8) { let _ = self.send(percent); }
}

/// Sink that drops every value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: u8) {}
}

/// Slice of the overall `0..=100` range assigned to one phase of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRange {
    start: u8,
    end:   u8,
}

impl ProgressRange {
    pub const FULL: ProgressRange = ProgressRange { start: 0, end: 100 };

    pub const fn new(start: u8, end: u8) -> Self {
        let end = if end > 100 { 100 } else { end };
        let start = if start > end { end } else { start };
        Self { start, end }
    }

    pub fn start(&self) -> u8 { self.start }

    pub fn end(&self) -> u8 { self.end }

    /// Map a phase-local percentage onto this range.
    pub fn scale(&self, percent: u8) -> u8 {
        let span = u16::from(self.end - self.start);
        let local = u16::from(percent.min(100));
        self.start + (span * local / 100) as u8
    }

    /// Percentage of `done` out of `total`, mapped onto this range.
    pub fn fraction(&self, done: u64, total: u64) -> u8 {
        let percent = if total == 0 {
            0
        } else {
            (u128::from(done.min(total)) * 100 / u128::from(total)) as u8
        };
        self.scale(percent)
    }
}

/// Throttling, monotonic front for a [`ProgressSink`].
///
/// Forwards a value only when it is strictly greater than the last one
/// forwarded. Values are capped at 99 until [`finish`](Self::finish).
pub struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    last: Mutex<Option<u8>>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            last: Mutex::new(None),
        }
    }

    /// Last value delivered to the sink.
    pub fn last(&self) -> Option<u8> { *self.lock() }

    /// Deliver the terminal `100`, at most once.
    pub fn finish(&self) {
        let mut last = self.lock();
        if *last != Some(100) {
            *last = Some(100);
            self.sink.report(100);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<u8>> {
        self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressSink for ProgressTracker<'_> {
    fn report(&self, percent: u8) {
        let percent = percent.min(99);
        let mut last = self.lock();
        if last.is_none_or(|prev| percent > prev) {
            *last = Some(percent);
            self.sink.report(percent);
        }
    }
}

/// Forwards phase-local percentages to `inner` through a [`ProgressRange`].
pub struct ScaledProgress<'a> {
    inner: &'a dyn ProgressSink,
    range: ProgressRange,
}

impl<'a> ScaledProgress<'a> {
    pub fn new(inner: &'a dyn ProgressSink, range: ProgressRange) -> Self { Self { inner, range } }
}

impl ProgressSink for ScaledProgress<'_> {
    fn report(&self, percent: u8) { self.inner.report(self.range.scale(percent)); }
}
