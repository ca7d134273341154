//! Logging setup and run spans.
//!
//! The engines log through [`tracing`]; nothing is printed unless the host
//! installs a subscriber. [`init_logging`] installs a `fmt` subscriber
//! filtered by `RUST_LOG`, falling back to `contextflow=info`.

use crate::context::Context;
use serde::{Deserialize, Serialize};
use tracing::Span;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_DIRECTIVE: &str = "contextflow=info";

/// Output format for [`init_logging`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per line.
    Json,
}

fn make_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_DIRECTIVE))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a global subscriber.
///
/// Returns false if a subscriber was already installed.
pub fn init_logging(format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(make_filter())
        .with_target(true);
    match format {
        LogFormat::Plain => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}

/// Span covering one pipeline run, tagged with the run's identity.
#[must_use]
pub fn run_span(pipeline: &str, ctx: &Context) -> Span {
    let identity = ctx.identity();
    tracing::info_span!(
        "pipeline_run",
        pipeline = %pipeline,
        run_id = %identity.run_id,
        session_id = %identity.session_id,
        user_id = %identity.user_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        init_logging(LogFormat::Json);
        assert!(!init_logging(LogFormat::Plain));
    }

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Plain);
    }

    #[test]
    fn test_run_span_builds_without_subscriber() {
        let ctx = Context::new("hi", "s", "u");
        let span = run_span("lightweight", &ctx);
        let _entered = span.enter();
    }
}
