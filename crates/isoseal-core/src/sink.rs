//! Push-only channels from a running job to its caller.

use std::sync::Mutex;
use std::sync::mpsc::Sender;

pub use isoseal_digest::{NoProgress, ProgressSink};

/// Ordered consumer of human-readable log lines.
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) { self(line) }
}

/// Lines sent after the receiver hung up are dropped.
impl LogSink for Sender<String> {
    fn log(&self, line: &str) { let _ = self.send(line.to_string()); }
}

/// Discards every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLog;

impl LogSink for NullLog {
    fn log(&self, _line: &str) {}
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self { Self::default() }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for CollectingSink {
    fn log(&self, line: &str) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push(line.to_string());
    }
}
