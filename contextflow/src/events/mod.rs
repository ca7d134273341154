//! Lifecycle events emitted by the engines.
//!
//! Every engine holds an `Arc<dyn EventSink>`; the default discards events.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type names.
pub mod names {
    /// A stage was launched.
    pub const STAGE_STARTED: &str = "stage.started";
    /// A stage completed and its output was merged.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// A stage returned an error, panicked, or hit a slot conflict.
    pub const STAGE_FAILED: &str = "stage.failed";
    /// A stage exceeded its timeout.
    pub const STAGE_TIMED_OUT: &str = "stage.timed_out";
    /// Synthesis failed and the default profile was used.
    pub const SYNTHESIS_FALLBACK: &str = "synthesis.fallback";
    /// A run finished.
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
}
