//! Stage descriptors: a stage plus the policy the engine applies to it.

use crate::analysis::SubAnalysis;
use crate::context::Slot;
use crate::errors::{codes, PipelineValidationError};
use crate::stages::{AnalysisStage, Stage};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// A stage registered in a sequential pipeline.
#[derive(Debug, Clone)]
pub struct StageDescriptor {
    /// Unique name within the run.
    pub name: String,
    /// Whether a failure fails the run.
    pub required: bool,
    /// Optional deadline; exceeding it counts as a failure.
    pub timeout: Option<Duration>,
    /// Slots this stage may overwrite once populated.
    pub depends_on: Vec<Slot>,
    /// The stage itself.
    pub stage: Arc<dyn Stage>,
}

impl StageDescriptor {
    /// Creates a required stage.
    #[must_use]
    pub fn required(name: impl Into<String>, stage: impl Stage + 'static) -> Self {
        Self::from_arc(name, true, Arc::new(stage))
    }

    /// Creates an optional stage.
    #[must_use]
    pub fn optional(name: impl Into<String>, stage: impl Stage + 'static) -> Self {
        Self::from_arc(name, false, Arc::new(stage))
    }

    /// Creates a descriptor around a shared stage.
    #[must_use]
    pub fn from_arc(name: impl Into<String>, required: bool, stage: Arc<dyn Stage>) -> Self {
        Self {
            name: name.into(),
            required,
            timeout: None,
            depends_on: Vec::new(),
            stage,
        }
    }

    /// Sets a deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Declares a dependency on `slot`, allowing the stage to overwrite it.
    #[must_use]
    pub fn depends_on(mut self, slot: Slot) -> Self {
        if !self.depends_on.contains(&slot) {
            self.depends_on.push(slot);
        }
        self
    }
}

/// A stage registered in a concurrent fan-out.
#[derive(Debug, Clone)]
pub struct AnalysisDescriptor {
    /// Unique name within the run; the key of its result.
    pub name: String,
    /// Whether a failure fails the run.
    pub required: bool,
    /// Deadline for this stage.
    pub timeout: Duration,
    /// Result stored when the stage fails or times out.
    pub fallback: SubAnalysis,
    /// The stage itself.
    pub stage: Arc<dyn AnalysisStage>,
}

impl AnalysisDescriptor {
    /// Creates a required stage.
    #[must_use]
    pub fn required(
        name: impl Into<String>,
        stage: impl AnalysisStage + 'static,
        timeout: Duration,
        fallback: SubAnalysis,
    ) -> Self {
        Self::from_arc(name, true, Arc::new(stage), timeout, fallback)
    }

    /// Creates an optional stage.
    #[must_use]
    pub fn optional(
        name: impl Into<String>,
        stage: impl AnalysisStage + 'static,
        timeout: Duration,
        fallback: SubAnalysis,
    ) -> Self {
        Self::from_arc(name, false, Arc::new(stage), timeout, fallback)
    }

    /// Creates a descriptor around a shared stage.
    #[must_use]
    pub fn from_arc(
        name: impl Into<String>,
        required: bool,
        stage: Arc<dyn AnalysisStage>,
        timeout: Duration,
        fallback: SubAnalysis,
    ) -> Self {
        Self {
            name: name.into(),
            required,
            timeout,
            fallback,
            stage,
        }
    }
}

/// Rejects empty or duplicate names and zero timeouts.
pub(crate) fn validate_stages<'a>(
    stages: impl IntoIterator<Item = (&'a str, Option<Duration>)>,
) -> Result<(), PipelineValidationError> {
    let mut seen = HashSet::new();
    for (name, timeout) in stages {
        if name.trim().is_empty() {
            return Err(PipelineValidationError::new(
                codes::EMPTY_NAME,
                "Stage name must not be empty",
            )
            .with_fix_hint("Give every stage a unique, non-empty name."));
        }
        if !seen.insert(name) {
            return Err(PipelineValidationError::new(
                codes::DUPLICATE,
                format!("Duplicate stage name '{name}'"),
            )
            .with_stages(vec![name.to_string()])
            .with_fix_hint("Results are keyed by name; rename one of the stages."));
        }
        validate_timeout(name, timeout)?;
    }
    Ok(())
}

/// Rejects a zero timeout. Engines also apply this to the effective timeout
/// once configuration overrides are resolved.
pub(crate) fn validate_timeout(name: &str, timeout: Option<Duration>) -> Result<(), PipelineValidationError> {
    if timeout.is_some_and(|t| t.is_zero()) {
        return Err(PipelineValidationError::new(
            codes::TIMEOUT,
            format!("Stage '{name}' has a zero timeout"),
        )
        .with_stages(vec![name.to_string()])
        .with_fix_hint("Use a timeout of at least one millisecond."));
    }
    Ok(())
}

pub(crate) fn validate_sequential(stages: &[StageDescriptor]) -> Result<(), PipelineValidationError> {
    validate_stages(stages.iter().map(|d| (d.name.as_str(), d.timeout)))
}

pub(crate) fn validate_concurrent(stages: &[AnalysisDescriptor]) -> Result<(), PipelineValidationError> {
    validate_stages(stages.iter().map(|d| (d.name.as_str(), Some(d.timeout))))
}
