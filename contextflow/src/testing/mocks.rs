//! Mock stages for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use std::time::Duration;

use crate::analysis::SubAnalysis;
use crate::context::{Context, Enrichments, Slot};
use crate::errors::StageError;
use crate::stages::{AnalysisStage, Stage};

/// Writes a fixed set of enrichment slots into the context.
#[derive(Debug, Clone, Default)]
pub struct StaticStage {
    slots: Enrichments,
}

impl StaticStage {
    /// Creates a stage that writes `slots`.
    #[must_use]
    pub fn new(slots: Enrichments) -> Self {
        Self { slots }
    }
}

#[async_trait]
impl Stage for StaticStage {
    async fn run(&self, mut ctx: Context) -> Result<Context, StageError> {
        let slots = self.slots.clone();
        if let Some(a) = slots.analysis {
            ctx = ctx.with_analysis(a);
        }
        if let Some(s) = slots.session_state {
            ctx = ctx.with_session_state(s);
        }
        if let Some(m) = slots.memory_view {
            ctx = ctx.with_memory_view(m);
        }
        if let Some(s) = slots.social_view {
            ctx = ctx.with_social_view(s);
        }
        if let Some(p) = slots.derived_profile {
            ctx = ctx.with_derived_profile(p);
        }
        Ok(ctx)
    }
}

/// Returns a fixed result after an optional, optionally jittered, delay.
#[derive(Debug, Clone)]
pub struct StaticAnalysis {
    result: SubAnalysis,
    delay: Duration,
    jitter: Duration,
}

impl StaticAnalysis {
    /// Returns `result` immediately.
    #[must_use]
    pub fn new(result: SubAnalysis) -> Self {
        Self {
            result,
            delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Waits `delay` before returning.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Adds a random extra delay of up to `jitter`.
    #[must_use]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn wait_time(&self) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.delay;
        }
        self.delay + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

#[async_trait]
impl AnalysisStage for StaticAnalysis {
    async fn analyze(&self, _ctx: &Context) -> Result<SubAnalysis, StageError> {
        let wait = self.wait_time();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        Ok(self.result.clone())
    }
}

/// Always fails with the given message.
#[derive(Debug, Clone)]
pub struct FailingStage {
    error: String,
}

impl FailingStage {
    /// Creates a failing stage.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

#[async_trait]
impl Stage for FailingStage {
    async fn run(&self, _ctx: Context) -> Result<Context, StageError> {
        Err(StageError::failed(&self.error))
    }
}

#[async_trait]
impl AnalysisStage for FailingStage {
    async fn analyze(&self, _ctx: &Context) -> Result<SubAnalysis, StageError> {
        Err(StageError::failed(&self.error))
    }
}

/// Always panics with the given message.
#[derive(Debug, Clone)]
pub struct PanickingStage {
    message: String,
}

impl PanickingStage {
    /// Creates a panicking stage.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Stage for PanickingStage {
    async fn run(&self, _ctx: Context) -> Result<Context, StageError> {
        panic!("{}", self.message)
    }
}

#[async_trait]
impl AnalysisStage for PanickingStage {
    async fn analyze(&self, _ctx: &Context) -> Result<SubAnalysis, StageError> {
        panic!("{}", self.message)
    }
}

/// Sleeps, then passes the context through or returns a fixed result.
#[derive(Debug, Clone)]
pub struct SlowStage {
    delay: Duration,
    result: SubAnalysis,
}

impl SlowStage {
    /// Creates a stage that sleeps `delay` and returns `result` when used concurrently.
    #[must_use]
    pub fn new(delay: Duration, result: SubAnalysis) -> Self {
        Self { delay, result }
    }

    /// Creates a slow stage with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(ms: u64, result: SubAnalysis) -> Self {
        Self::new(Duration::from_millis(ms), result)
    }
}

#[async_trait]
impl Stage for SlowStage {
    async fn run(&self, ctx: Context) -> Result<Context, StageError> {
        tokio::time::sleep(self.delay).await;
        Ok(ctx)
    }
}

#[async_trait]
impl AnalysisStage for SlowStage {
    async fn analyze(&self, _ctx: &Context) -> Result<SubAnalysis, StageError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.result.clone())
    }
}

/// What a [`RecordingStage`] saw on one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// The operations log at the time of the call.
    pub operations_seen: Vec<String>,
    /// Slots populated at the time of the call.
    pub slots_seen: Vec<Slot>,
}

/// Records every context it receives and passes it through.
#[derive(Debug, Default)]
pub struct RecordingStage {
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingStage {
    /// Creates a recording stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, ctx: &Context) {
        self.calls.lock().push(RecordedCall {
            operations_seen: ctx.operations_log().to_vec(),
            slots_seen: ctx.enrichments().populated(),
        });
    }
}

#[async_trait]
impl Stage for RecordingStage {
    async fn run(&self, ctx: Context) -> Result<Context, StageError> {
        self.record(&ctx);
        Ok(ctx)
    }
}

#[async_trait]
impl AnalysisStage for RecordingStage {
    async fn analyze(&self, ctx: &Context) -> Result<SubAnalysis, StageError> {
        self.record(ctx);
        Ok(SubAnalysis::custom_fallback("recording"))
    }
}
