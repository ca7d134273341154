//! Pipeline definition and execution.
//!
//! This module provides:
//! - Stage descriptors carrying required/optional and timeout policy
//! - The sequential and concurrent engines
//! - The synthesis contract and the default synthesizer
//! - Named pipeline configurations, a builder, and the orchestrator

mod attempt;
mod builder;
mod concurrent;
mod definition;
mod descriptor;
mod orchestrator;
mod sequential;
mod synthesis;

#[cfg(test)]
mod integration_tests;

pub use builder::PipelineBuilder;
pub use concurrent::{ConcurrentEngine, ConcurrentRun};
pub use definition::{pipeline_names, stage_names, Collaborators, PipelineDefinition, PipelineMode};
pub use descriptor::{AnalysisDescriptor, StageDescriptor};
pub use orchestrator::{ContextOrchestrator, PipelineRun};
pub use sequential::{SequentialEngine, SequentialRun};
pub use synthesis::{
    results_from_enrichments, synthesize_guarded, ProfileSynthesizer, SynthesisRun, Synthesizer,
    SYNTHESIS_STAGE,
};
