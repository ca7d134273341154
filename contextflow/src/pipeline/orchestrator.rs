//! Runs pipeline definitions and folds their outcome into the context.

use super::concurrent::ConcurrentEngine;
use super::definition::{Collaborators, PipelineDefinition, PipelineMode};
use super::descriptor::{AnalysisDescriptor, StageDescriptor};
use super::sequential::SequentialEngine;
use super::synthesis::{synthesize_guarded, Synthesizer, SYNTHESIS_STAGE};
use crate::analysis::{DerivedProfile, ResultMap, SubAnalysis};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::errors::{ContextflowError, PipelineValidationError};
use crate::events::{names, EventSink, NoOpEventSink};
use crate::stages::builtin::SessionStore;
use crate::trace::ExecutionTrace;
use crate::observability::run_span;
use crate::utils::iso_timestamp;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Outcome of one orchestrated run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// The final context.
    pub context: Context,
    /// Stage attempts, plus the synthesis step for concurrent runs.
    pub trace: ExecutionTrace,
    /// False if a required stage failed.
    pub success: bool,
    /// The merged results of a concurrent run.
    pub results: Option<ResultMap>,
}

/// Entry point for running enrichment pipelines.
///
/// When a session store is attached, the orchestrator resolves the run's
/// [`crate::context::SessionHandle`] before any stage runs and carries it on
/// the context.
#[derive(Clone)]
pub struct ContextOrchestrator {
    sequential: SequentialEngine,
    concurrent: ConcurrentEngine,
    sink: Arc<dyn EventSink>,
    sessions: Option<Arc<dyn SessionStore>>,
}

impl std::fmt::Debug for ContextOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextOrchestrator")
            .field("config", self.concurrent.config())
            .field("has_session_store", &self.sessions.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for ContextOrchestrator {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ContextOrchestrator {
    /// Creates an orchestrator that discards events.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            sequential: SequentialEngine::new(config.clone()),
            concurrent: ConcurrentEngine::new(config),
            sink: Arc::new(NoOpEventSink),
            sessions: None,
        }
    }

    /// Creates an orchestrator from a JSON configuration file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, ContextflowError> {
        Ok(Self::new(EngineConfig::from_file(path)?))
    }

    /// Sets the event sink for both engines.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sequential = self.sequential.with_event_sink(Arc::clone(&sink));
        self.concurrent = self.concurrent.with_event_sink(Arc::clone(&sink));
        self.sink = sink;
        self
    }

    /// Attaches the store used to resolve session handles.
    #[must_use]
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        self.concurrent.config()
    }

    /// Runs a definition in its mode.
    pub async fn run(
        &self,
        ctx: Context,
        definition: &PipelineDefinition,
    ) -> Result<PipelineRun, PipelineValidationError> {
        definition.validate()?;
        let span = run_span(&definition.name, &ctx);
        async move {
            info!(stages = definition.stage_names().len(), "Running pipeline");
            match &definition.mode {
                PipelineMode::Sequential(stages) => self.run_sequential(ctx, stages).await,
                PipelineMode::Concurrent { stages, synthesizer } => {
                    self.run_concurrent(ctx, stages, synthesizer.as_ref()).await
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Runs a named configuration built over `collaborators`.
    pub async fn run_named(
        &self,
        ctx: Context,
        name: &str,
        collaborators: &Collaborators,
    ) -> Result<PipelineRun, ContextflowError> {
        let definition = PipelineDefinition::named(name, collaborators, self.config())?;
        Ok(self.run(ctx, &definition).await?)
    }

    /// Runs stages one after another.
    ///
    /// If no stage leaves a derived profile, the fallback profile is stored.
    pub async fn run_sequential(
        &self,
        ctx: Context,
        stages: &[StageDescriptor],
    ) -> Result<PipelineRun, PipelineValidationError> {
        let ctx = self.attach_session(ctx).await;
        let mut run = self.sequential.run(ctx, stages).await?;

        if run.context.derived_profile().is_none() {
            warn!("No stage produced a derived profile; using fallback profile");
            self.sink.try_emit(
                names::SYNTHESIS_FALLBACK,
                Some(serde_json::json!({"error": "no derived profile after sequential run"})),
            );
            run.context.enrichments_mut().derived_profile = Some(DerivedProfile::fallback());
        }

        Ok(PipelineRun {
            context: run.context,
            trace: run.trace,
            success: run.success,
            results: None,
        })
    }

    /// Fans out `stages`, synthesizes, and folds everything into the context.
    ///
    /// Genuine results fill the matching empty slots, completed stage names
    /// are logged in registration order followed by the synthesis step, and
    /// errors are appended in registration order. The synthesized profile is
    /// stored only if the context has none yet. Synthesis failure never fails
    /// the run.
    pub async fn run_concurrent(
        &self,
        ctx: Context,
        stages: &[AnalysisDescriptor],
        synthesizer: &dyn Synthesizer,
    ) -> Result<PipelineRun, PipelineValidationError> {
        let mut ctx = self.attach_session(ctx).await;
        let run = self.concurrent.run(&ctx, stages).await?;

        for name in &run.completed {
            if let Some(result) = run.results.get(name) {
                fill_slot(&mut ctx, name, result);
            }
            ctx.record_operation(name.as_str());
        }
        for error in run.errors {
            ctx.record_error(error);
        }

        let synthesis = synthesize_guarded(
            synthesizer,
            &run.results,
            &run.fallbacks,
            &ctx,
            self.sink.as_ref(),
        )
        .await;
        if synthesis.succeeded() {
            ctx.record_operation(SYNTHESIS_STAGE);
        }
        if let Some(error) = synthesis.error {
            ctx.record_error(error);
        }
        let slots = ctx.enrichments_mut();
        if slots.derived_profile.is_none() {
            slots.derived_profile = Some(synthesis.profile);
        } else {
            debug!("Derived profile already populated; synthesized profile not stored");
        }

        let mut trace = run.trace;
        trace.push(synthesis.entry);

        self.sink.try_emit(
            names::PIPELINE_COMPLETED,
            Some(serde_json::json!({
                "mode": "concurrent",
                "success": run.success,
                "operations": ctx.operations_log(),
                "completed_at": iso_timestamp(),
            })),
        );
        info!(success = run.success, errors = ctx.errors().len(), "Concurrent pipeline finished");

        Ok(PipelineRun {
            context: ctx,
            trace,
            success: run.success,
            results: Some(run.results),
        })
    }

    async fn attach_session(&self, ctx: Context) -> Context {
        let Some(store) = &self.sessions else {
            return ctx;
        };
        if ctx.session().is_some() {
            return ctx;
        }
        match store.resolve(ctx.session_id()).await {
            Ok(handle) => ctx.with_session(handle),
            Err(error) => {
                warn!(session_id = %ctx.session_id(), error = %error, "Could not resolve session handle");
                ctx
            }
        }
    }
}

/// Copies a genuine result into its slot unless the slot is already populated.
fn fill_slot(ctx: &mut Context, stage: &str, result: &SubAnalysis) {
    let slots = ctx.enrichments_mut();
    let filled = match result {
        SubAnalysis::Message(m) if slots.analysis.is_none() => {
            slots.analysis = Some(m.clone());
            true
        }
        SubAnalysis::Session(s) if slots.session_state.is_none() => {
            slots.session_state = Some(s.clone());
            true
        }
        SubAnalysis::Memory(m) if slots.memory_view.is_none() => {
            slots.memory_view = Some(m.clone());
            true
        }
        SubAnalysis::Social(s) if slots.social_view.is_none() => {
            slots.social_view = Some(s.clone());
            true
        }
        _ => false,
    };
    if !filled {
        debug!(stage = %stage, kind = result.kind(), "Result not copied into a slot");
    }
}
