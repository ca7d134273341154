//! The record threaded through a pipeline run.

use super::{ContextError, RunIdentity, SessionHandle};
use crate::analysis::{DerivedProfile, MemoryView, MessageAnalysis, SessionState, SocialView};
use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A named enrichment slot on the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Message analysis.
    Analysis,
    /// Session state.
    SessionState,
    /// Recalled memories.
    MemoryView,
    /// Social-graph view.
    SocialView,
    /// Synthesized profile.
    DerivedProfile,
}

impl Slot {
    /// Every slot, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Analysis,
        Self::SessionState,
        Self::MemoryView,
        Self::SocialView,
        Self::DerivedProfile,
    ];
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => write!(f, "analysis"),
            Self::SessionState => write!(f, "session_state"),
            Self::MemoryView => write!(f, "memory_view"),
            Self::SocialView => write!(f, "social_view"),
            Self::DerivedProfile => write!(f, "derived_profile"),
        }
    }
}

/// A stage tried to replace a populated slot it did not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("slot '{slot}' is already populated and the stage does not declare a dependency on it")]
pub struct SlotConflict {
    /// The slot involved.
    pub slot: Slot,
}

/// Optional enrichment slots populated as stages complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Enrichments {
    /// Message analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<MessageAnalysis>,
    /// Session state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_state: Option<SessionState>,
    /// Recalled memories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_view: Option<MemoryView>,
    /// Social-graph view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_view: Option<SocialView>,
    /// Synthesized profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_profile: Option<DerivedProfile>,
}

impl Enrichments {
    /// Returns true if the slot holds a value.
    #[must_use]
    pub fn is_set(&self, slot: Slot) -> bool {
        match slot {
            Slot::Analysis => self.analysis.is_some(),
            Slot::SessionState => self.session_state.is_some(),
            Slot::MemoryView => self.memory_view.is_some(),
            Slot::SocialView => self.social_view.is_some(),
            Slot::DerivedProfile => self.derived_profile.is_some(),
        }
    }

    /// Names of the populated slots.
    #[must_use]
    pub fn populated(&self) -> Vec<Slot> {
        Slot::ALL.into_iter().filter(|s| self.is_set(*s)).collect()
    }

    fn same_as(&self, other: &Self, slot: Slot) -> bool {
        match slot {
            Slot::Analysis => self.analysis == other.analysis,
            Slot::SessionState => self.session_state == other.session_state,
            Slot::MemoryView => self.memory_view == other.memory_view,
            Slot::SocialView => self.social_view == other.social_view,
            Slot::DerivedProfile => self.derived_profile == other.derived_profile,
        }
    }

    fn take_from(&mut self, other: &mut Self, slot: Slot) {
        match slot {
            Slot::Analysis => self.analysis = other.analysis.take(),
            Slot::SessionState => self.session_state = other.session_state.take(),
            Slot::MemoryView => self.memory_view = other.memory_view.take(),
            Slot::SocialView => self.social_view = other.social_view.take(),
            Slot::DerivedProfile => self.derived_profile = other.derived_profile.take(),
        }
    }
}

/// One in-flight enrichment run.
///
/// Stages receive a `Context` by value and return a new one. Only the
/// enrichment slots of a returned context are merged back; the message,
/// identity, creation time, operations log and error list belong to the
/// engine and are never taken from stage output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auxiliary_text: Option<String>,
    created_at: Timestamp,
    identity: RunIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<SessionHandle>,
    #[serde(default)]
    operations_log: Vec<String>,
    #[serde(default)]
    errors: Vec<ContextError>,
    #[serde(default)]
    enrichments: Enrichments,
}

impl Context {
    /// Creates a context for a new run.
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        session_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::with_identity(message, RunIdentity::new(session_id, user_id))
    }

    /// Creates a context with an explicit identity.
    #[must_use]
    pub fn with_identity(message: impl Into<String>, identity: RunIdentity) -> Self {
        Self {
            message: message.into(),
            auxiliary_text: None,
            created_at: now_utc(),
            identity,
            session: None,
            operations_log: Vec::new(),
            errors: Vec::new(),
            enrichments: Enrichments::default(),
        }
    }

    /// Sets the caller-supplied auxiliary text.
    #[must_use]
    pub fn with_auxiliary_text(mut self, text: impl Into<String>) -> Self {
        self.auxiliary_text = Some(text.into());
        self
    }

    /// Attaches the session handle resolved for this run.
    #[must_use]
    pub fn with_session(mut self, handle: SessionHandle) -> Self {
        self.session = Some(handle);
        self
    }

    /// Sets the message analysis slot.
    #[must_use]
    pub fn with_analysis(mut self, analysis: MessageAnalysis) -> Self {
        self.enrichments.analysis = Some(analysis);
        self
    }

    /// Sets the session state slot.
    #[must_use]
    pub fn with_session_state(mut self, state: SessionState) -> Self {
        self.enrichments.session_state = Some(state);
        self
    }

    /// Sets the memory view slot.
    #[must_use]
    pub fn with_memory_view(mut self, view: MemoryView) -> Self {
        self.enrichments.memory_view = Some(view);
        self
    }

    /// Sets the social view slot.
    #[must_use]
    pub fn with_social_view(mut self, view: SocialView) -> Self {
        self.enrichments.social_view = Some(view);
        self
    }

    /// Sets the derived profile slot.
    #[must_use]
    pub fn with_derived_profile(mut self, profile: DerivedProfile) -> Self {
        self.enrichments.derived_profile = Some(profile);
        self
    }

    /// The input message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The caller-supplied auxiliary text.
    #[must_use]
    pub fn auxiliary_text(&self) -> Option<&str> {
        self.auxiliary_text.as_deref()
    }

    /// When the run started.
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// The run identity.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// The session ID.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.identity.session_id
    }

    /// The user ID.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    /// The resolved session handle, if any.
    #[must_use]
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Names of the stages that completed, in completion order.
    #[must_use]
    pub fn operations_log(&self) -> &[String] {
        &self.operations_log
    }

    /// Errors recorded so far.
    #[must_use]
    pub fn errors(&self) -> &[ContextError] {
        &self.errors
    }

    /// Returns true if any error entry is non-recoverable.
    #[must_use]
    pub fn has_fatal_errors(&self) -> bool {
        self.errors.iter().any(|e| !e.recoverable)
    }

    /// All enrichment slots.
    #[must_use]
    pub fn enrichments(&self) -> &Enrichments {
        &self.enrichments
    }

    /// The message analysis slot.
    #[must_use]
    pub fn analysis(&self) -> Option<&MessageAnalysis> {
        self.enrichments.analysis.as_ref()
    }

    /// The session state slot.
    #[must_use]
    pub fn session_state(&self) -> Option<&SessionState> {
        self.enrichments.session_state.as_ref()
    }

    /// The memory view slot.
    #[must_use]
    pub fn memory_view(&self) -> Option<&MemoryView> {
        self.enrichments.memory_view.as_ref()
    }

    /// The social view slot.
    #[must_use]
    pub fn social_view(&self) -> Option<&SocialView> {
        self.enrichments.social_view.as_ref()
    }

    /// The derived profile slot.
    #[must_use]
    pub fn derived_profile(&self) -> Option<&DerivedProfile> {
        self.enrichments.derived_profile.as_ref()
    }

    /// Stable digest of the run's observable content.
    ///
    /// Excludes timestamps, the run ID and the session token so two runs of
    /// deterministic stages over the same input produce the same digest.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        #[derive(Serialize)]
        struct ErrorView<'a> {
            stage: &'a str,
            message: &'a str,
            recoverable: bool,
            kind: super::ErrorKind,
        }

        #[derive(Serialize)]
        struct FingerprintView<'a> {
            message: &'a str,
            auxiliary_text: Option<&'a str>,
            session_id: &'a str,
            user_id: &'a str,
            operations_log: &'a [String],
            errors: Vec<ErrorView<'a>>,
            enrichments: &'a Enrichments,
        }

        let view = FingerprintView {
            message: &self.message,
            auxiliary_text: self.auxiliary_text.as_deref(),
            session_id: &self.identity.session_id,
            user_id: &self.identity.user_id,
            operations_log: &self.operations_log,
            errors: self
                .errors
                .iter()
                .map(|e| ErrorView {
                    stage: &e.stage,
                    message: &e.message,
                    recoverable: e.recoverable,
                    kind: e.kind,
                })
                .collect(),
            enrichments: &self.enrichments,
        };

        let bytes = serde_json::to_vec(&view).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    pub(crate) fn record_operation(&mut self, stage: impl Into<String>) {
        self.operations_log.push(stage.into());
    }

    pub(crate) fn record_error(&mut self, error: ContextError) {
        self.errors.push(error);
    }

    pub(crate) fn enrichments_mut(&mut self) -> &mut Enrichments {
        &mut self.enrichments
    }

    /// Merges the enrichment slots of a stage's output into this context.
    ///
    /// A slot the output leaves empty is never cleared. A populated slot may
    /// only be replaced by a different value if `declared` names it. The merge
    /// is all-or-nothing: on conflict nothing is written.
    pub(crate) fn merge_enrichments(
        &mut self,
        output: Self,
        declared: &[Slot],
    ) -> Result<Vec<Slot>, SlotConflict> {
        let mut incoming = output.enrichments;
        let mut written = Vec::new();

        for slot in Slot::ALL {
            if !incoming.is_set(slot) || self.enrichments.same_as(&incoming, slot) {
                continue;
            }
            if self.enrichments.is_set(slot) && !declared.contains(&slot) {
                return Err(SlotConflict { slot });
            }
            written.push(slot);
        }

        for slot in &written {
            self.enrichments.take_from(&mut incoming, *slot);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Intent;
    use crate::context::ErrorKind;

    fn ctx() -> Context {
        Context::new("Dinner with Ana tonight?", "session-1", "user-1")
    }

    #[test]
    fn test_new_context_is_empty() {
        let ctx = ctx().with_auxiliary_text("user is travelling");
        assert_eq!(ctx.message(), "Dinner with Ana tonight?");
        assert_eq!(ctx.auxiliary_text(), Some("user is travelling"));
        assert!(ctx.operations_log().is_empty());
        assert!(ctx.errors().is_empty());
        assert!(ctx.enrichments().populated().is_empty());
    }

    #[test]
    fn test_merge_fills_empty_slots() {
        let mut running = ctx();
        let output = running
            .clone()
            .with_analysis(MessageAnalysis::new(Intent::Social, 0.9));

        let written = running.merge_enrichments(output, &[]).unwrap();
        assert_eq!(written, vec![Slot::Analysis]);
        assert_eq!(running.analysis().unwrap().intent, Intent::Social);
    }

    #[test]
    fn test_merge_rejects_undeclared_overwrite() {
        let mut running = ctx().with_analysis(MessageAnalysis::new(Intent::Social, 0.9));
        let output = running
            .clone()
            .with_analysis(MessageAnalysis::new(Intent::Question, 0.4))
            .with_memory_view(MemoryView::default());

        let conflict = running.merge_enrichments(output, &[]).unwrap_err();
        assert_eq!(conflict.slot, Slot::Analysis);
        // all-or-nothing
        assert!(running.memory_view().is_none());
        assert_eq!(running.analysis().unwrap().intent, Intent::Social);
    }

    #[test]
    fn test_merge_allows_declared_overwrite() {
        let mut running = ctx().with_analysis(MessageAnalysis::new(Intent::Social, 0.9));
        let output = running
            .clone()
            .with_analysis(MessageAnalysis::new(Intent::Question, 0.4));

        running.merge_enrichments(output, &[Slot::Analysis]).unwrap();
        assert_eq!(running.analysis().unwrap().intent, Intent::Question);
    }

    #[test]
    fn test_merge_ignores_engine_owned_fields() {
        let mut running = ctx();
        let mut output = running.clone();
        output.record_operation("sneaky");
        output.record_error(ContextError::new("x", "y", ErrorKind::StageFailure, true));

        running.merge_enrichments(output, &[]).unwrap();
        assert!(running.operations_log().is_empty());
        assert!(running.errors().is_empty());
    }

    #[test]
    fn test_merge_never_clears() {
        let mut running = ctx().with_memory_view(MemoryView::default());
        let output = ctx();

        running.merge_enrichments(output, &[]).unwrap();
        assert!(running.memory_view().is_some());
    }

    #[test]
    fn test_fingerprint_ignores_timestamps_and_run_id() {
        let a = ctx().with_analysis(MessageAnalysis::new(Intent::Social, 0.9));
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = ctx().with_analysis(MessageAnalysis::new(Intent::Social, 0.9));

        assert_ne!(a.identity().run_id, b.identity().run_id);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = ctx().with_analysis(MessageAnalysis::new(Intent::Question, 0.9));
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_has_fatal_errors() {
        let mut ctx = ctx();
        ctx.record_error(ContextError::new("memory", "down", ErrorKind::StageFailure, true));
        assert!(!ctx.has_fatal_errors());
        ctx.record_error(ContextError::new("message", "down", ErrorKind::StageFailure, false));
        assert!(ctx.has_fatal_errors());
    }
}
