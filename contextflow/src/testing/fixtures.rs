//! Test fixtures for pipeline testing.

use crate::analysis::{
    CommunicationStyle, FallbackSet, Intent, MemorySnippet, MemoryView, MessageAnalysis,
    Relationship, ResultMap, SessionState, SocialView, SubAnalysis,
};
use crate::context::{Context, SessionHandle};
use crate::pipeline::{stage_names, Collaborators};
use crate::stages::builtin::{
    InMemoryMemoryProvider, InMemoryRelationshipProvider, InMemorySessionStore,
};
use std::sync::Arc;

/// A test context builder.
#[derive(Debug, Clone)]
pub struct TestContext {
    /// Message text.
    pub message: String,
    /// Session ID.
    pub session_id: String,
    /// User ID.
    pub user_id: String,
    /// Attach a session handle.
    pub with_handle: bool,
}

impl Default for TestContext {
    fn default() -> Self {
        Self {
            message: "Dinner with Ana tonight?".to_string(),
            session_id: "session-1".to_string(),
            user_id: "user-1".to_string(),
            with_handle: false,
        }
    }
}

impl TestContext {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Sets the session ID.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Attaches a session handle to the built context.
    #[must_use]
    pub fn with_session_handle(mut self) -> Self {
        self.with_handle = true;
        self
    }

    /// Builds the context.
    #[must_use]
    pub fn build(&self) -> Context {
        let ctx = Context::new(&self.message, &self.session_id, &self.user_id);
        if self.with_handle {
            ctx.with_session(SessionHandle::new(&self.session_id))
        } else {
            ctx
        }
    }
}

/// In-memory collaborators seeded for `user-1` / `session-1`: two earlier
/// turns, memories about Ana and Marco, and a close relationship with Ana.
#[must_use]
pub fn seeded_collaborators() -> Collaborators {
    let sessions = InMemorySessionStore::new();
    sessions.record_turn("session-1", &["plans"]);
    sessions.record_turn("session-1", &["food"]);

    let memories = InMemoryMemoryProvider::new();
    memories.remember("user-1", "Ana loves the Italian place downtown");
    memories.remember("user-1", "Marco is allergic to peanuts");

    let relationships = InMemoryRelationshipProvider::new();
    relationships.add(
        "user-1",
        Relationship::new("Ana", 0.9).with_preferred_style(CommunicationStyle::Warm),
    );
    relationships.add("user-1", Relationship::new("Marco", 0.5));

    Collaborators::new(Arc::new(sessions), Arc::new(memories), Arc::new(relationships))
}

/// A fully populated result map keyed by the concurrent stage names.
#[must_use]
pub fn sample_results() -> ResultMap {
    let mut results = ResultMap::new();
    results.insert(
        stage_names::MESSAGE_ANALYSIS.to_string(),
        SubAnalysis::Message(
            MessageAnalysis::new(Intent::Social, 0.8).with_entities(vec!["Ana".to_string()]),
        ),
    );
    results.insert(
        stage_names::SESSION_ANALYSIS.to_string(),
        SubAnalysis::Session(SessionState::new("session-1", 2, 0.8)),
    );
    results.insert(
        stage_names::MEMORY_ANALYSIS.to_string(),
        SubAnalysis::Memory(MemoryView::new(
            vec![MemorySnippet::new("Ana loves the Italian place downtown", 0.5)],
            0.75,
        )),
    );
    results.insert(
        stage_names::SOCIAL_ANALYSIS.to_string(),
        SubAnalysis::Social(SocialView::new(
            Some(Relationship::new("Ana", 0.9).with_preferred_style(CommunicationStyle::Warm)),
            0.95,
        )),
    );
    results
}

/// A result map where every entry is a fallback.
#[must_use]
pub fn fallback_results() -> ResultMap {
    let mut results = ResultMap::new();
    results.insert(stage_names::MESSAGE_ANALYSIS.to_string(), SubAnalysis::message_fallback());
    results.insert(
        stage_names::SESSION_ANALYSIS.to_string(),
        SubAnalysis::session_fallback("session-1"),
    );
    results.insert(stage_names::MEMORY_ANALYSIS.to_string(), SubAnalysis::memory_fallback());
    results.insert(stage_names::SOCIAL_ANALYSIS.to_string(), SubAnalysis::social_fallback());
    results
}

/// The names of every entry in [`fallback_results`].
#[must_use]
pub fn fallback_names() -> FallbackSet {
    fallback_results().into_keys().collect()
}
