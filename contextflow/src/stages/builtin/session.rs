//! Session state lookup behind an explicit session handle.

use crate::analysis::{SessionState, SubAnalysis};
use crate::context::{Context, SessionHandle};
use crate::errors::StageError;
use crate::stages::{AnalysisStage, Stage};
use crate::utils::{now_utc, Timestamp};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Storage for conversation sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Issues a handle for `session_id`.
    async fn resolve(&self, session_id: &str) -> Result<SessionHandle, StageError>;

    /// Reads the state behind a handle. `None` for a session never seen before.
    async fn state(&self, handle: &SessionHandle) -> Result<Option<SessionState>, StageError>;
}

#[derive(Debug, Clone, Default)]
struct SessionRecord {
    turn_count: u32,
    topics: Vec<String>,
    last_interaction: Option<Timestamp>,
}

/// A [`SessionStore`] held in a concurrent map.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, SessionRecord>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more turn, adding any new topics.
    pub fn record_turn(&self, session_id: &str, topics: &[&str]) {
        let mut record = self.sessions.entry(session_id.to_string()).or_default();
        record.turn_count += 1;
        for topic in topics {
            if !record.topics.iter().any(|t| t == topic) {
                record.topics.push((*topic).to_string());
            }
        }
        record.last_interaction = Some(now_utc());
    }

    /// Number of known sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no session has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn resolve(&self, session_id: &str) -> Result<SessionHandle, StageError> {
        if session_id.is_empty() {
            return Err(StageError::missing_input("session id"));
        }
        Ok(SessionHandle::new(session_id))
    }

    async fn state(&self, handle: &SessionHandle) -> Result<Option<SessionState>, StageError> {
        Ok(self.sessions.get(&handle.session_id).map(|record| {
            let confidence = (0.6 + 0.1 * f64::from(record.turn_count)).min(0.95);
            let mut state = SessionState::new(&handle.session_id, record.turn_count, confidence)
                .with_topics(record.topics.clone());
            state.last_interaction = record.last_interaction;
            state
        }))
    }
}

/// Reads session state for the run's session.
///
/// Uses the handle already attached to the context when it matches the
/// session ID, otherwise resolves one from the store.
pub struct SessionStage {
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for SessionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStage").finish_non_exhaustive()
    }
}

impl SessionStage {
    /// Confidence reported for a session the store has never seen.
    pub const NEW_SESSION_CONFIDENCE: f64 = 0.5;

    /// Creates a stage reading from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    async fn load(&self, ctx: &Context) -> Result<SessionState, StageError> {
        let handle = match ctx.session() {
            Some(handle) if handle.session_id == ctx.session_id() => handle.clone(),
            _ => self.store.resolve(ctx.session_id()).await?,
        };

        Ok(self
            .store
            .state(&handle)
            .await?
            .unwrap_or_else(|| SessionState::new(&handle.session_id, 0, Self::NEW_SESSION_CONFIDENCE)))
    }
}

#[async_trait]
impl AnalysisStage for SessionStage {
    async fn analyze(&self, ctx: &Context) -> Result<SubAnalysis, StageError> {
        self.load(ctx).await.map(SubAnalysis::Session)
    }
}

#[async_trait]
impl Stage for SessionStage {
    async fn run(&self, ctx: Context) -> Result<Context, StageError> {
        let state = self.load(&ctx).await?;
        Ok(ctx.with_session_state(state))
    }
}
