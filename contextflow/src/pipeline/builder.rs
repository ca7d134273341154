//! Fluent builder for custom pipeline definitions.

use super::definition::{PipelineDefinition, PipelineMode};
use super::descriptor::{AnalysisDescriptor, StageDescriptor};
use super::synthesis::Synthesizer;
use crate::errors::{codes, PipelineValidationError};
use std::sync::Arc;

/// Builds a [`PipelineDefinition`].
///
/// Add either sequential stages with [`PipelineBuilder::stage`] or
/// concurrent stages with [`PipelineBuilder::analysis`], never both. A
/// concurrent pipeline needs a synthesizer.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    name: String,
    stages: Vec<StageDescriptor>,
    analyses: Vec<AnalysisDescriptor>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
}

impl PipelineBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            analyses: Vec::new(),
            synthesizer: None,
        }
    }

    /// Appends a sequential stage.
    #[must_use]
    pub fn stage(mut self, descriptor: StageDescriptor) -> Self {
        self.stages.push(descriptor);
        self
    }

    /// Adds a concurrent stage.
    #[must_use]
    pub fn analysis(mut self, descriptor: AnalysisDescriptor) -> Self {
        self.analyses.push(descriptor);
        self
    }

    /// Sets the synthesis step of a concurrent pipeline.
    #[must_use]
    pub fn synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Validates and builds the definition.
    ///
    /// An empty builder yields an empty sequential pipeline.
    pub fn build(self) -> Result<PipelineDefinition, PipelineValidationError> {
        if !self.stages.is_empty() && !self.analyses.is_empty() {
            let mut names: Vec<String> = self.stages.iter().map(|s| s.name.clone()).collect();
            names.extend(self.analyses.iter().map(|s| s.name.clone()));
            return Err(PipelineValidationError::new(
                codes::MIXED_MODES,
                format!("Pipeline '{}' mixes sequential and concurrent stages", self.name),
            )
            .with_stages(names)
            .with_fix_hint("Split the stages into two pipelines."));
        }

        let mode = if self.analyses.is_empty() {
            PipelineMode::Sequential(self.stages)
        } else {
            let Some(synthesizer) = self.synthesizer else {
                return Err(PipelineValidationError::new(
                    codes::NO_SYNTHESIZER,
                    format!("Concurrent pipeline '{}' has no synthesizer", self.name),
                )
                .with_fix_hint("Call .synthesizer(...) before .build()."));
            };
            PipelineMode::Concurrent {
                stages: self.analyses,
                synthesizer,
            }
        };

        let definition = PipelineDefinition {
            name: self.name,
            mode,
        };
        definition.validate()?;
        Ok(definition)
    }
}
