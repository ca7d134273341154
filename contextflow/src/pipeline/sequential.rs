//! Sequential engine: each stage consumes the previous stage's context.

use super::attempt::{run_guarded, StageFailure};
use super::descriptor::{validate_sequential, validate_timeout, StageDescriptor};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::errors::PipelineValidationError;
use crate::events::{names, EventSink, NoOpEventSink};
use crate::trace::{ExecutionTrace, StageOutcome, TraceEntry, TraceMode};
use crate::utils::{duration_ms, iso_timestamp, now_utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a sequential run.
#[derive(Debug, Clone)]
pub struct SequentialRun {
    /// The final context.
    pub context: Context,
    /// One entry per attempted stage, in invocation order.
    pub trace: ExecutionTrace,
    /// False if a required stage failed.
    pub success: bool,
}

/// Runs stages one after another in registration order.
///
/// A required failure stops the run and returns the context as of the last
/// successful stage. An optional failure is recorded and the next stage
/// receives the pre-failure context.
#[derive(Clone)]
pub struct SequentialEngine {
    config: EngineConfig,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for SequentialEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for SequentialEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SequentialEngine {
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

    /// Runs `stages` against `initial`.
    ///
    /// Only an invalid stage list is reported as `Err`; stage failures are
    /// recorded on the returned context.
    pub async fn run(
        &self,
        initial: Context,
        stages: &[StageDescriptor],
    ) -> Result<SequentialRun, PipelineValidationError> {
        validate_sequential(stages)?;
        let timeouts = stages
            .iter()
            .map(|desc| {
                let timeout = self.config.stage_timeout(&desc.name).or(desc.timeout);
                validate_timeout(&desc.name, timeout).map(|()| timeout)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut ctx = initial;
        let mut trace = ExecutionTrace::new(TraceMode::Sequential);
        let mut success = true;

        for (desc, timeout) in stages.iter().zip(timeouts) {
            let name = desc.name.as_str();

            debug!(stage = %name, required = desc.required, "Starting stage");
            self.sink.try_emit(
                names::STAGE_STARTED,
                Some(serde_json::json!({"stage": name, "required": desc.required})),
            );

            let started_at = now_utc();
            let attempt = run_guarded(desc.stage.run(ctx.clone()), timeout).await;
            let merged = attempt.and_then(|output| {
                ctx.merge_enrichments(output, &desc.depends_on)
                    .map_err(|conflict| StageFailure::conflict(&conflict))
            });
            let ended_at = now_utc();
            let elapsed = duration_ms(started_at, ended_at);

            match merged {
                Ok(written) => {
                    ctx.record_operation(name);
                    trace.push(TraceEntry::new(name, started_at, ended_at, StageOutcome::Completed));
                    debug!(stage = %name, slots = ?written, duration_ms = elapsed, "Stage completed");
                    self.sink.try_emit(
                        names::STAGE_COMPLETED,
                        Some(serde_json::json!({"stage": name, "duration_ms": elapsed})),
                    );
                }
                Err(failure) => {
                    trace.push(TraceEntry::new(name, started_at, ended_at, failure.outcome));
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
                        warn!(stage = %name, error = %failure.message, "Required stage failed; stopping run");
                        ctx.record_error(failure.into_error(name, false));
                        success = false;
                        break;
                    }

                    warn!(stage = %name, error = %failure.message, "Optional stage failed; continuing");
                    ctx.record_error(failure.into_error(name, true));
                }
            }
        }

        info!(
            success,
            stages = stages.len(),
            completed = ctx.operations_log().len(),
            errors = ctx.errors().len(),
            "Sequential run finished"
        );
        self.sink.try_emit(
            names::PIPELINE_COMPLETED,
            Some(serde_json::json!({
                "mode": "sequential",
                "success": success,
                "operations": ctx.operations_log(),
                "completed_at": iso_timestamp(),
            })),
        );

        Ok(SequentialRun {
            context: ctx,
            trace,
            success,
        })
    }
}
