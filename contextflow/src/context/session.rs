//! Explicit session handles.
//!
//! A handle is resolved once per run by whoever owns session storage and is
//! carried on the [`super::Context`]; stages read it instead of reaching for
//! process-wide session state.

use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A resolved session for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    /// Session this handle refers to.
    pub session_id: String,
    /// Opaque token issued by the session store for this run.
    pub token: Uuid,
    /// When the handle was resolved.
    pub resolved_at: Timestamp,
}

impl SessionHandle {
    /// Creates a handle with a fresh token.
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            token: Uuid::new_v4(),
            resolved_at: now_utc(),
        }
    }
}
