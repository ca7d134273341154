//! Pipeline definitions, including the named configurations.

use super::builder::PipelineBuilder;
use super::descriptor::{validate_concurrent, validate_sequential, AnalysisDescriptor, StageDescriptor};
use super::synthesis::{ProfileSynthesizer, Synthesizer};
use crate::analysis::SubAnalysis;
use crate::config::EngineConfig;
use crate::errors::{codes, PipelineValidationError};
use crate::stages::builtin::{
    InMemoryMemoryProvider, InMemoryRelationshipProvider, InMemorySessionStore,
    KeywordMessageAnalyzer, MemoryProvider, MemoryRecallStage, PersonalityStage,
    RelationshipProvider, SessionStage, SessionStore, SocialLookupStage,
};
use std::sync::Arc;
use std::time::Duration;

/// Stage names used by the named configurations.
pub mod stage_names {
    /// Message analysis, both modes.
    pub const MESSAGE_ANALYSIS: &str = "message-analysis";
    /// Session state, sequential.
    pub const SESSION_CONTEXT: &str = "session-context";
    /// Memory recall, sequential.
    pub const MEMORY_CONTEXT: &str = "memory-context";
    /// Relationship lookup, sequential.
    pub const SOCIAL_CONTEXT: &str = "social-context";
    /// Profile synthesis, sequential.
    pub const PERSONALITY_CONTEXT: &str = "personality-context";
    /// Session state, concurrent.
    pub const SESSION_ANALYSIS: &str = "session-analysis";
    /// Memory recall, concurrent.
    pub const MEMORY_ANALYSIS: &str = "memory-analysis";
    /// Relationship lookup, concurrent.
    pub const SOCIAL_ANALYSIS: &str = "social-analysis";
}

/// Names of the built-in pipelines.
pub mod pipeline_names {
    /// Five dependent stages run one after another.
    pub const SEQUENTIAL_DEPENDENT: &str = "sequential-dependent";
    /// Four independent analyses, then synthesis.
    pub const PARALLEL_THEN_SYNTHESIZE: &str = "parallel-then-synthesize";
    /// Message and session analyses only, then synthesis.
    pub const LIGHTWEIGHT: &str = "lightweight";
}

/// How a pipeline schedules its stages.
#[derive(Debug, Clone)]
pub enum PipelineMode {
    /// Each stage consumes the previous stage's context.
    Sequential(Vec<StageDescriptor>),
    /// Independent stages fan out, then one synthesis step runs.
    Concurrent {
        /// The stages to fan out.
        stages: Vec<AnalysisDescriptor>,
        /// The synthesis step.
        synthesizer: Arc<dyn Synthesizer>,
    },
}

/// A named, validated pipeline.
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    /// Pipeline name.
    pub name: String,
    /// Stages and scheduling mode.
    pub mode: PipelineMode,
}

/// The collaborators the reference stages read from.
#[derive(Clone)]
pub struct Collaborators {
    /// Session storage.
    pub sessions: Arc<dyn SessionStore>,
    /// Memory storage.
    pub memories: Arc<dyn MemoryProvider>,
    /// Relationship storage.
    pub relationships: Arc<dyn RelationshipProvider>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Bundles explicit collaborators.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        memories: Arc<dyn MemoryProvider>,
        relationships: Arc<dyn RelationshipProvider>,
    ) -> Self {
        Self {
            sessions,
            memories,
            relationships,
        }
    }

    /// Empty in-memory collaborators.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryMemoryProvider::new()),
            Arc::new(InMemoryRelationshipProvider::new()),
        )
    }
}

impl PipelineDefinition {
    /// Message analysis and session context are required; memory, social
    /// and personality context are optional.
    #[must_use]
    pub fn sequential_dependent(collaborators: &Collaborators, config: &EngineConfig) -> Self {
        use stage_names::*;

        Self {
            name: pipeline_names::SEQUENTIAL_DEPENDENT.to_string(),
            mode: PipelineMode::Sequential(vec![
                StageDescriptor::required(MESSAGE_ANALYSIS, KeywordMessageAnalyzer::new()),
                StageDescriptor::required(
                    SESSION_CONTEXT,
                    SessionStage::new(Arc::clone(&collaborators.sessions)),
                ),
                StageDescriptor::optional(
                    MEMORY_CONTEXT,
                    MemoryRecallStage::from_config(Arc::clone(&collaborators.memories), config),
                ),
                StageDescriptor::optional(
                    SOCIAL_CONTEXT,
                    SocialLookupStage::new(Arc::clone(&collaborators.relationships)),
                ),
                StageDescriptor::optional(
                    PERSONALITY_CONTEXT,
                    PersonalityStage::new(ProfileSynthesizer::from_config(config)),
                ),
            ]),
        }
    }

    /// Message analysis (5s) and session analysis (2s) are required; memory
    /// and social analysis (3s each) are optional. Then synthesis.
    #[must_use]
    pub fn parallel_then_synthesize(collaborators: &Collaborators, config: &EngineConfig) -> Self {
        use stage_names::*;

        let mut stages = lightweight_stages(collaborators);
        stages.push(AnalysisDescriptor::optional(
            MEMORY_ANALYSIS,
            MemoryRecallStage::from_config(Arc::clone(&collaborators.memories), config),
            Duration::from_millis(3_000),
            SubAnalysis::memory_fallback(),
        ));
        stages.push(AnalysisDescriptor::optional(
            SOCIAL_ANALYSIS,
            SocialLookupStage::new(Arc::clone(&collaborators.relationships)),
            Duration::from_millis(3_000),
            SubAnalysis::social_fallback(),
        ));

        Self {
            name: pipeline_names::PARALLEL_THEN_SYNTHESIZE.to_string(),
            mode: PipelineMode::Concurrent {
                stages,
                synthesizer: Arc::new(ProfileSynthesizer::from_config(config)),
            },
        }
    }

    /// Message and session analysis only, then synthesis.
    #[must_use]
    pub fn lightweight(collaborators: &Collaborators, config: &EngineConfig) -> Self {
        Self {
            name: pipeline_names::LIGHTWEIGHT.to_string(),
            mode: PipelineMode::Concurrent {
                stages: lightweight_stages(collaborators),
                synthesizer: Arc::new(ProfileSynthesizer::from_config(config)),
            },
        }
    }

    /// Looks up a named configuration.
    pub fn named(
        name: &str,
        collaborators: &Collaborators,
        config: &EngineConfig,
    ) -> Result<Self, PipelineValidationError> {
        match name {
            pipeline_names::SEQUENTIAL_DEPENDENT => {
                Ok(Self::sequential_dependent(collaborators, config))
            }
            pipeline_names::PARALLEL_THEN_SYNTHESIZE => {
                Ok(Self::parallel_then_synthesize(collaborators, config))
            }
            pipeline_names::LIGHTWEIGHT => Ok(Self::lightweight(collaborators, config)),
            other => Err(PipelineValidationError::new(
                codes::UNKNOWN_PIPELINE,
                format!("No pipeline configuration named '{other}'"),
            )
            .with_fix_hint(format!(
                "Use one of: {}, {}, {}",
                pipeline_names::SEQUENTIAL_DEPENDENT,
                pipeline_names::PARALLEL_THEN_SYNTHESIZE,
                pipeline_names::LIGHTWEIGHT
            ))),
        }
    }

    /// Starts a custom definition.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    /// Registered stage names, in registration order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        match &self.mode {
            PipelineMode::Sequential(stages) => stages.iter().map(|s| s.name.as_str()).collect(),
            PipelineMode::Concurrent { stages, .. } => {
                stages.iter().map(|s| s.name.as_str()).collect()
            }
        }
    }

    /// Returns true for concurrent definitions.
    #[must_use]
    pub fn is_concurrent(&self) -> bool {
        matches!(self.mode, PipelineMode::Concurrent { .. })
    }

    /// Checks the name and the stage list.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new(
                codes::EMPTY_PIPELINE_NAME,
                "Pipeline name must not be empty",
            ));
        }
        match &self.mode {
            PipelineMode::Sequential(stages) => validate_sequential(stages),
            PipelineMode::Concurrent { stages, .. } => validate_concurrent(stages),
        }
    }
}

fn lightweight_stages(collaborators: &Collaborators) -> Vec<AnalysisDescriptor> {
    use stage_names::*;

    vec![
        AnalysisDescriptor::required(
            MESSAGE_ANALYSIS,
            KeywordMessageAnalyzer::new(),
            Duration::from_millis(5_000),
            SubAnalysis::message_fallback(),
        ),
        AnalysisDescriptor::required(
            SESSION_ANALYSIS,
            SessionStage::new(Arc::clone(&collaborators.sessions)),
            Duration::from_millis(2_000),
            SubAnalysis::session_fallback(""),
        ),
    ]
}
