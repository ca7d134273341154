//! # Contextflow
//!
//! Builds the conversational context an agent needs before it replies.
//!
//! Contextflow runs enrichment stages over a [`context::Context`] with:
//!
//! - **Sequential pipelines**: stages run in order, each seeing earlier output
//! - **Concurrent pipelines**: stages fan out, results are merged by name
//! - **Required/optional policy**: per-stage timeouts and confidence-capped fallbacks
//! - **Synthesis**: a derived profile that never fails and never leaves `[0, 1]`
//! - **Execution traces**: one timed entry per stage attempt
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use contextflow::prelude::*;
//!
//! let config = EngineConfig::default();
//! let definition = PipelineDefinition::lightweight(&Collaborators::in_memory(), &config);
//! let orchestrator = ContextOrchestrator::new(config);
//!
//! let run = orchestrator
//!     .run(Context::new("Hi there!", "session-1", "user-1"), &definition)
//!     .await?;
//! assert!(run.context.derived_profile().is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod analysis;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod trace;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analysis::{
        CommunicationStyle, DerivedProfile, FallbackSet, Intent, MemoryView, MessageAnalysis,
        Relationship, ResultMap, SessionState, SocialView, SubAnalysis,
    };
    pub use crate::config::{EngineConfig, SynthesisWeights};
    pub use crate::context::{Context, ContextError, ErrorKind, RunIdentity, SessionHandle, Slot};
    pub use crate::errors::{ConfigError, PipelineValidationError, StageError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::pipeline::{
        AnalysisDescriptor, Collaborators, ConcurrentEngine, ContextOrchestrator,
        PipelineBuilder, PipelineDefinition, PipelineRun, ProfileSynthesizer, SequentialEngine,
        StageDescriptor, Synthesizer,
    };
    pub use crate::stages::{AnalysisStage, Stage};
    pub use crate::trace::{ExecutionTrace, StageOutcome};
    pub use crate::utils::{iso_timestamp, Timestamp};
}
