//! Capturing a single stage attempt as a value.

use crate::context::{ContextError, ErrorKind};
use crate::errors::StageError;
use crate::trace::StageOutcome;
use crate::utils::panic_message;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// Why a stage attempt did not produce a usable value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StageFailure {
    pub kind: ErrorKind,
    pub outcome: StageOutcome,
    pub message: String,
}

impl StageFailure {
    pub fn failed(error: &StageError) -> Self {
        Self {
            kind: ErrorKind::StageFailure,
            outcome: StageOutcome::Failed,
            message: error.to_string(),
        }
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Panic,
            outcome: StageOutcome::Panicked,
            message: format!("stage panicked: {}", message.into()),
        }
    }

    pub fn timed_out(after: Duration) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            outcome: StageOutcome::TimedOut,
            message: format!("timed out after {}ms", after.as_millis()),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: ErrorKind::StageFailure,
            outcome: StageOutcome::Failed,
            message: "stage task was cancelled".to_string(),
        }
    }

    pub fn conflict(error: &crate::context::SlotConflict) -> Self {
        Self {
            kind: ErrorKind::SlotConflict,
            outcome: StageOutcome::SlotConflict,
            message: error.to_string(),
        }
    }

    pub fn into_error(self, stage: &str, recoverable: bool) -> ContextError {
        ContextError::new(stage, self.message, self.kind, recoverable)
    }
}

/// Polls `fut` in place, converting errors, panics and an expired deadline
/// into a [`StageFailure`]. Dropping the future on timeout cancels it at its
/// next yield point.
pub(crate) async fn run_guarded<T, F>(fut: F, timeout: Option<Duration>) -> Result<T, StageFailure>
where
    F: Future<Output = Result<T, StageError>>,
{
    let guarded = AssertUnwindSafe(fut).catch_unwind();

    let caught = match timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(caught) => caught,
            Err(_) => return Err(StageFailure::timed_out(limit)),
        },
        None => guarded.await,
    };

    match caught {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(StageFailure::failed(&error)),
        Err(payload) => Err(StageFailure::panicked(panic_message(&*payload))),
    }
}
