use std::fmt;

use tracing::debug;

use crate::{EngineError, Result};

/// Lifecycle of a single signing or verification job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Created,
    Hashing,
    Signing,
    Bundling,
    Done,
    Verifying,
    Passed,
    Rejected,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Hashing => "HASHING",
            Self::Signing => "SIGNING",
            Self::Bundling => "BUNDLING",
            Self::Done => "DONE",
            Self::Verifying => "VERIFYING",
            Self::Passed => "PASSED",
            Self::Rejected => "REJECTED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Done | Self::Passed | Self::Rejected | Self::Failed) }

    /// Whether `self -> next` is a legal step.
    pub fn can_transition(&self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (s, Failed) => !s.is_terminal(),
            (Created, Hashing) | (Hashing, Signing) | (Signing, Bundling) | (Bundling, Done) => true,
            (Created, Verifying) | (Verifying, Passed) | (Verifying, Rejected) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Signing,
    Verification,
}

/// A job's current state; transitions are checked.
#[derive(Debug)]
pub struct Job {
    kind:  JobKind,
    state: JobState,
}

impl Job {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            state: JobState::Created,
        }
    }

    pub fn kind(&self) -> JobKind { self.kind }

    pub fn state(&self) -> JobState { self.state }

    pub fn advance(&mut self, next: JobState) -> Result<()> {
        if !self.state.can_transition(next) {
            return Err(EngineError::InvalidTransition {
                from: self.state,
                to:   next,
            });
        }
        debug!(kind = ?self.kind, from = %self.state, to = %next, "job transition");
        self.state = next;
        Ok(())
    }

    /// Move to `Failed` unless already finished.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            debug!(kind = ?self.kind, from = %self.state, "job failed");
            self.state = JobState::Failed;
        }
    }
}
