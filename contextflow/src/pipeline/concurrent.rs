//! Concurrent engine: fan out independent stages, fan in by name.

use super::attempt::StageFailure;
use super::descriptor::{validate_concurrent, validate_timeout, AnalysisDescriptor};
use crate::analysis::{FallbackSet, ResultMap, SubAnalysis};
use crate::config::EngineConfig;
use crate::context::{Context, ContextError};
use crate::errors::{PipelineValidationError, StageError};
use crate::events::{names, EventSink, NoOpEventSink};
use crate::trace::{ExecutionTrace, StageOutcome, TraceEntry, TraceMode};
use crate::utils::{duration_ms, now_utc, panic_message, Timestamp};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of a concurrent run.
#[derive(Debug, Clone)]
pub struct ConcurrentRun {
    /// Exactly one entry per registered stage, ordered by name.
    pub results: ResultMap,
    /// Failures, in stage registration order.
    pub errors: Vec<ContextError>,
    /// Names of stages that produced a genuine result, in registration order.
    pub completed: Vec<String>,
    /// Names of stages whose entry in `results` is their fallback.
    pub fallbacks: FallbackSet,
    /// One entry per stage, in completion order.
    pub trace: ExecutionTrace,
    /// False if a required stage failed or timed out.
    pub success: bool,
}

struct Finished {
    index: usize,
    started_at: Timestamp,
    ended_at: Timestamp,
    outcome: Result<SubAnalysis, StageFailure>,
}

/// Launches every stage at once against a shared read-only context.
///
/// Each stage runs in its own task under its own timeout. A timed-out task
/// is aborted, which stops it at its next yield point; work that never
/// yields, or that was already handed to another system, may keep running.
/// The engine always waits for every stage before returning, even after a
/// required stage has failed.
#[derive(Clone)]
pub struct ConcurrentEngine {
    config: EngineConfig,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for ConcurrentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for ConcurrentEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ConcurrentEngine {
    /// Creates an engine that discards events.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs every stage against `ctx` and merges the results by name.
    pub async fn run(
        &self,
        ctx: &Context,
        stages: &[AnalysisDescriptor],
    ) -> Result<ConcurrentRun, PipelineValidationError> {
        validate_concurrent(stages)?;
        let timeouts = stages
            .iter()
            .map(|desc| {
                let timeout = self.config.timeout_for(&desc.name, Some(desc.timeout));
                validate_timeout(&desc.name, Some(timeout)).map(|()| timeout)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let shared = Arc::new(ctx.clone());
        let mut pending = FuturesUnordered::new();

        for (index, (desc, timeout)) in stages.iter().zip(timeouts).enumerate() {
            debug!(stage = %desc.name, required = desc.required, timeout_ms = timeout.as_millis() as u64, "Launching stage");
            self.sink.try_emit(
                names::STAGE_STARTED,
                Some(serde_json::json!({"stage": desc.name, "required": desc.required})),
            );

            let stage = Arc::clone(&desc.stage);
            let ctx = Arc::clone(&shared);
            let started_at = now_utc();
            let handle = tokio::spawn(async move { stage.analyze(&ctx).await });

            pending.push(async move {
                let outcome = await_with_deadline(handle, timeout).await;
                Finished {
                    index,
                    started_at,
                    ended_at: now_utc(),
                    outcome,
                }
            });
        }

        let mut results = ResultMap::new();
        let mut failures: Vec<(usize, ContextError)> = Vec::new();
        let mut completed = vec![false; stages.len()];
        let mut fallbacks = FallbackSet::new();
        let mut trace = ExecutionTrace::new(TraceMode::Concurrent);
        let mut success = true;

        while let Some(finished) = pending.next().await {
            let desc = &stages[finished.index];
            let name = desc.name.as_str();
            let elapsed = duration_ms(finished.started_at, finished.ended_at);

            match finished.outcome {
                Ok(result) => {
                    trace.push(TraceEntry::new(
                        name,
                        finished.started_at,
                        finished.ended_at,
                        StageOutcome::Completed,
                    ));
                    debug!(stage = %name, kind = result.kind(), duration_ms = elapsed, "Stage completed");
                    self.sink.try_emit(
                        names::STAGE_COMPLETED,
                        Some(serde_json::json!({"stage": name, "duration_ms": elapsed})),
                    );
                    results.insert(desc.name.clone(), result.clamped());
                    completed[finished.index] = true;
                }
                Err(failure) => {
                    trace.push(TraceEntry::new(
                        name,
                        finished.started_at,
                        finished.ended_at,
                        failure.outcome,
                    ));
                    let event = if failure.outcome == StageOutcome::TimedOut {
                        names::STAGE_TIMED_OUT
                    } else {
                        names::STAGE_FAILED
                    };
                    self.sink.try_emit(
                        event,
                        Some(serde_json::json!({
                            "stage": name,
                            "error": failure.message,
                            "required": desc.required,
                            "duration_ms": elapsed,
                        })),
                    );

                    if desc.required {
                        warn!(stage = %name, error = %failure.message, "Required stage failed; using fallback");
                        success = false;
                    } else {
                        warn!(stage = %name, error = %failure.message, "Optional stage failed; using fallback");
                    }

                    let fallback = desc
                        .fallback
                        .clone()
                        .bound_to_session(ctx.session_id())
                        .capped(self.config.fallback_confidence);
                    results.insert(desc.name.clone(), fallback);
                    fallbacks.insert(desc.name.clone());
                    failures.push((finished.index, failure.into_error(name, !desc.required)));
                }
            }
        }

        failures.sort_by_key(|(index, _)| *index);
        let errors = failures.into_iter().map(|(_, e)| e).collect();
        let completed = stages
            .iter()
            .zip(completed)
            .filter_map(|(d, ok)| ok.then(|| d.name.clone()))
            .collect();

        info!(
            success,
            stages = stages.len(),
            results = results.len(),
            "Concurrent run finished"
        );

        Ok(ConcurrentRun {
            results,
            errors,
            completed,
            fallbacks,
            trace,
            success,
        })
    }
}

async fn await_with_deadline(
    mut handle: JoinHandle<Result<SubAnalysis, StageError>>,
    timeout: Duration,
) -> Result<SubAnalysis, StageFailure> {
    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(Ok(result))) => Ok(result),
        Ok(Ok(Err(error))) => Err(StageFailure::failed(&error)),
        Ok(Err(join_error)) if join_error.is_panic() => {
            Err(StageFailure::panicked(panic_message(&*join_error.into_panic())))
        }
        Ok(Err(_)) => Err(StageFailure::cancelled()),
        Err(_) => {
            handle.abort();
            Err(StageFailure::timed_out(timeout))
        }
    }
}
