//! The concurrent engine's unit of output.

use super::types::clamp_confidence;
use super::{Confidence, Intent, MemoryView, MessageAnalysis, SessionState, SocialView};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Default confidence of a fallback result.
pub const FALLBACK_CONFIDENCE: f64 = 0.1;

/// Name-keyed merge map produced by the concurrent engine.
///
/// A `BTreeMap` so iteration and serialization order depend on stage names
/// only, never on completion order.
pub type ResultMap = BTreeMap<String, SubAnalysis>;

/// Names of the [`ResultMap`] entries that hold a substituted fallback.
pub type FallbackSet = BTreeSet<String>;

/// A named, confidence-scored output of one concurrent stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubAnalysis {
    /// Message intent analysis.
    Message(MessageAnalysis),
    /// Session state lookup.
    Session(SessionState),
    /// Memory recall.
    Memory(MemoryView),
    /// Social-graph lookup.
    Social(SocialView),
    /// Output of a stage kind the engine has no typed slot for.
    Custom {
        /// Free-form label of the producing stage kind.
        label: String,
        /// Confidence in `[0.0, 1.0]`.
        confidence: f64,
        /// Stage-specific payload.
        #[serde(default)]
        data: serde_json::Value,
    },
}

impl SubAnalysis {
    /// Fallback for a message analysis stage.
    #[must_use]
    pub fn message_fallback() -> Self {
        Self::Message(MessageAnalysis::new(Intent::Unknown, FALLBACK_CONFIDENCE))
    }

    /// Fallback for a session stage.
    #[must_use]
    pub fn session_fallback(session_id: impl Into<String>) -> Self {
        Self::Session(SessionState::new(session_id, 0, FALLBACK_CONFIDENCE))
    }

    /// Fallback for a memory stage: no snippets.
    #[must_use]
    pub fn memory_fallback() -> Self {
        Self::Memory(MemoryView::new(Vec::new(), FALLBACK_CONFIDENCE))
    }

    /// Fallback for a social stage: no relationship.
    #[must_use]
    pub fn social_fallback() -> Self {
        Self::Social(SocialView::new(None, FALLBACK_CONFIDENCE))
    }

    /// Fallback for a custom stage.
    #[must_use]
    pub fn custom_fallback(label: impl Into<String>) -> Self {
        Self::Custom {
            label: label.into(),
            confidence: FALLBACK_CONFIDENCE,
            data: serde_json::Value::Null,
        }
    }

    /// Fills an empty session id from `session_id`. Other variants are
    /// returned unchanged.
    #[must_use]
    pub fn bound_to_session(mut self, session_id: &str) -> Self {
        if let Self::Session(state) = &mut self {
            if state.session_id.is_empty() {
                state.session_id = session_id.to_string();
            }
        }
        self
    }

    /// Short name of the variant.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Message(_) => "message",
            Self::Session(_) => "session",
            Self::Memory(_) => "memory",
            Self::Social(_) => "social",
            Self::Custom { label, .. } => label,
        }
    }

    /// Clamps the confidence into `[0.0, 1.0]`.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        clamp_confidence(self.confidence_mut());
        self
    }

    /// Clamps the confidence into `[0.0, max]`.
    #[must_use]
    pub fn capped(mut self, max: f64) -> Self {
        let confidence = self.confidence_mut();
        clamp_confidence(confidence);
        if *confidence > max {
            *confidence = max;
        }
        self
    }

    fn confidence_mut(&mut self) -> &mut f64 {
        match self {
            Self::Message(m) => &mut m.confidence,
            Self::Session(s) => &mut s.confidence,
            Self::Memory(m) => &mut m.confidence,
            Self::Social(s) => &mut s.confidence,
            Self::Custom { confidence, .. } => confidence,
        }
    }

    /// Returns the message analysis, if this is one.
    #[must_use]
    pub fn as_message(&self) -> Option<&MessageAnalysis> {
        match self {
            Self::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the session state, if this is one.
    #[must_use]
    pub fn as_session(&self) -> Option<&SessionState> {
        match self {
            Self::Session(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the memory view, if this is one.
    #[must_use]
    pub fn as_memory(&self) -> Option<&MemoryView> {
        match self {
            Self::Memory(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the social view, if this is one.
    #[must_use]
    pub fn as_social(&self) -> Option<&SocialView> {
        match self {
            Self::Social(s) => Some(s),
            _ => None,
        }
    }
}

impl Confidence for SubAnalysis {
    fn confidence(&self) -> f64 {
        match self {
            Self::Message(m) => m.confidence,
            Self::Session(s) => s.confidence,
            Self::Memory(m) => m.confidence,
            Self::Social(s) => s.confidence,
            Self::Custom { confidence, .. } => *confidence,
        }
    }
}

impl From<MessageAnalysis> for SubAnalysis {
    fn from(value: MessageAnalysis) -> Self {
        Self::Message(value)
    }
}

impl From<SessionState> for SubAnalysis {
    fn from(value: SessionState) -> Self {
        Self::Session(value)
    }
}

impl From<MemoryView> for SubAnalysis {
    fn from(value: MemoryView) -> Self {
        Self::Memory(value)
    }
}

impl From<SocialView> for SubAnalysis {
    fn from(value: SocialView) -> Self {
        Self::Social(value)
    }
}
