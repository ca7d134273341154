//! Error entries recorded on a context during a run.

use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What went wrong with a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The stage returned an error.
    StageFailure,
    /// The stage did not resolve before its deadline.
    Timeout,
    /// The stage panicked.
    Panic,
    /// The stage overwrote a slot it did not declare a dependency on.
    SlotConflict,
    /// The synthesizer failed; the fallback profile was used.
    SynthesisFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StageFailure => write!(f, "stage_failure"),
            Self::Timeout => write!(f, "timeout"),
            Self::Panic => write!(f, "panic"),
            Self::SlotConflict => write!(f, "slot_conflict"),
            Self::SynthesisFailure => write!(f, "synthesis_failure"),
        }
    }
}

/// One entry of a context's append-only error list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextError {
    /// Stage that failed.
    pub stage: String,
    /// Error text.
    pub message: String,
    /// False when the failure failed the run.
    pub recoverable: bool,
    /// Failure category.
    pub kind: ErrorKind,
    /// When the failure was recorded.
    pub occurred_at: Timestamp,
}

impl ContextError {
    /// Creates a new error entry.
    #[must_use]
    pub fn new(
        stage: impl Into<String>,
        message: impl Into<String>,
        kind: ErrorKind,
        recoverable: bool,
    ) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
            recoverable,
            kind,
            occurred_at: now_utc(),
        }
    }
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = if self.recoverable { "recoverable" } else { "fatal" };
        write!(f, "[{severity} {}] {}: {}", self.kind, self.stage, self.message)
    }
}
