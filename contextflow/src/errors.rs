//! Error types for the contextflow engine.
//!
//! Stage failures never escape an engine run; they are captured as
//! [`crate::context::ContextError`] entries. The types here cover the
//! failures that *do* reach a caller: invalid pipeline definitions, bad
//! configuration, and the error a stage implementation returns to the engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for contextflow operations.
#[derive(Debug, Error)]
pub enum ContextflowError {
    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// Configuration could not be loaded or is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A stage returned an error outside of an engine run.
    #[error("{0}")]
    Stage(#[from] StageError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error returned by a stage implementation.
///
/// Implementations that lean on `anyhow` can use `?` directly; the error is
/// wrapped in [`StageError::Other`] and its display text ends up in the
/// context's error list.
#[derive(Debug, Error)]
pub enum StageError {
    /// The stage ran but could not produce a result.
    #[error("{0}")]
    Failed(String),

    /// A slot or input the stage needs was not present in the context.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// A collaborator (store, provider, model client) was unavailable.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// Any other error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StageError {
    /// Creates a generic failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Creates a missing-input failure.
    #[must_use]
    pub fn missing_input(what: impl Into<String>) -> Self {
        Self::MissingInput(what.into())
    }

    /// Creates a collaborator-unavailable failure.
    #[must_use]
    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::Unavailable(what.into())
    }
}

/// Machine-readable validation codes.
pub mod codes {
    /// A stage has an empty or whitespace-only name.
    pub const EMPTY_NAME: &str = "CONTEXT-001-EMPTY_NAME";
    /// Two stages in one definition share a name.
    pub const DUPLICATE: &str = "CONTEXT-002-DUPLICATE";
    /// A concurrent stage declares a zero timeout.
    pub const TIMEOUT: &str = "CONTEXT-003-TIMEOUT";
    /// A concurrent definition has no synthesizer.
    pub const NO_SYNTHESIZER: &str = "CONTEXT-004-NO_SYNTHESIZER";
    /// A pipeline definition has an empty name.
    pub const EMPTY_PIPELINE_NAME: &str = "CONTEXT-005-EMPTY_PIPELINE_NAME";
    /// A pipeline definition mixes sequential and concurrent stages.
    pub const MIXED_MODES: &str = "CONTEXT-006-MIXED_MODES";
    /// No named configuration matches the requested name.
    pub const UNKNOWN_PIPELINE: &str = "CONTEXT-007-UNKNOWN_PIPELINE";
}

/// Error raised when a pipeline definition is invalid.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// Validation code, see [`codes`].
    pub code: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            stages: Vec::new(),
            fix_hint: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("message".to_string(), serde_json::json!(self.message));
        map.insert("stages".to_string(), serde_json::json!(self.stages));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        map
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("cannot read configuration file {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A value is out of its allowed range.
    #[error("configuration value '{field}' is out of range: {reason}")]
    OutOfRange {
        /// The offending field.
        field: String,
        /// Why it is invalid.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an out-of-range error.
    #[must_use]
    pub fn out_of_range(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
