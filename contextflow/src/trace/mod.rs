//! Execution traces.
//!
//! One [`TraceEntry`] is recorded per stage attempt. Entries are in
//! invocation order for sequential runs and completion order for concurrent
//! runs; nothing downstream depends on their position.

use crate::utils::{duration_ms, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a stage attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// The stage returned a value that was merged.
    Completed,
    /// The stage returned an error.
    Failed,
    /// The stage exceeded its timeout.
    TimedOut,
    /// The stage panicked.
    Panicked,
    /// The stage overwrote a slot it did not declare.
    SlotConflict,
}

impl StageOutcome {
    /// Returns true only for [`StageOutcome::Completed`].
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Panicked => write!(f, "panicked"),
            Self::SlotConflict => write!(f, "slot_conflict"),
        }
    }
}

/// Scheduling mode a trace was recorded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceMode {
    /// Invocation order.
    Sequential,
    /// Completion order.
    Concurrent,
}

/// One stage attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Stage name.
    pub stage: String,
    /// When the attempt started.
    pub started_at: Timestamp,
    /// When the attempt ended.
    pub ended_at: Timestamp,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// How it ended.
    pub outcome: StageOutcome,
}

impl TraceEntry {
    /// Creates an entry; `success` follows from `outcome`.
    #[must_use]
    pub fn new(
        stage: impl Into<String>,
        started_at: Timestamp,
        ended_at: Timestamp,
        outcome: StageOutcome,
    ) -> Self {
        Self {
            stage: stage.into(),
            started_at,
            ended_at,
            success: outcome.is_success(),
            outcome,
        }
    }

    /// Wall-clock duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        duration_ms(self.started_at, self.ended_at)
    }
}

/// Ordered record of stage attempts for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    mode: TraceMode,
    entries: Vec<TraceEntry>,
}

impl ExecutionTrace {
    /// Creates an empty trace.
    #[must_use]
    pub fn new(mode: TraceMode) -> Self {
        Self {
            mode,
            entries: Vec::new(),
        }
    }

    /// The scheduling mode.
    #[must_use]
    pub fn mode(&self) -> TraceMode {
        self.mode
    }

    /// All entries.
    #[must_use]
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no stage was attempted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry for `stage`.
    #[must_use]
    pub fn get(&self, stage: &str) -> Option<&TraceEntry> {
        self.entries.iter().find(|e| e.stage == stage)
    }

    /// Stage names in trace order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.stage.as_str()).collect()
    }

    /// `(stage, outcome)` pairs sorted by stage name.
    ///
    /// Independent of completion order, so two runs can be compared.
    #[must_use]
    pub fn outcomes(&self) -> Vec<(String, StageOutcome)> {
        let mut out: Vec<_> = self
            .entries
            .iter()
            .map(|e| (e.stage.clone(), e.outcome))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Aggregate counts and timings.
    #[must_use]
    pub fn summary(&self) -> TraceSummary {
        let count = |o: StageOutcome| self.entries.iter().filter(|e| e.outcome == o).count();
        let started = self.entries.iter().map(|e| e.started_at).min();
        let ended = self.entries.iter().map(|e| e.ended_at).max();

        TraceSummary {
            attempted: self.entries.len(),
            completed: count(StageOutcome::Completed),
            failed: count(StageOutcome::Failed)
                + count(StageOutcome::Panicked)
                + count(StageOutcome::SlotConflict),
            timed_out: count(StageOutcome::TimedOut),
            wall_clock_ms: match (started, ended) {
                (Some(s), Some(e)) => duration_ms(s, e),
                _ => 0.0,
            },
            slowest_stage: self
                .entries
                .iter()
                .max_by(|a, b| a.duration_ms().total_cmp(&b.duration_ms()))
                .map(|e| e.stage.clone()),
        }
    }

    pub(crate) fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }
}

/// Aggregated view of a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Stage attempts.
    pub attempted: usize,
    /// Attempts that completed.
    pub completed: usize,
    /// Attempts that failed, panicked or conflicted.
    pub failed: usize,
    /// Attempts that timed out.
    pub timed_out: usize,
    /// From the earliest start to the latest end.
    pub wall_clock_ms: f64,
    /// The longest-running stage.
    pub slowest_stage: Option<String>,
}
