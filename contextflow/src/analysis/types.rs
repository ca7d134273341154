//! Typed enrichment records produced by stages.

use super::CommunicationStyle;
use crate::utils::{clamp_unit, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Anything that carries a confidence score in `[0.0, 1.0]`.
pub trait Confidence {
    /// Returns the confidence score.
    fn confidence(&self) -> f64;
}

/// The dominant intent of an incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Opening or closing pleasantries.
    Greeting,
    /// The user asks for information.
    Question,
    /// The user asks the agent to do something.
    Request,
    /// The user shares feelings.
    Emotional,
    /// The message is about other people or social plans.
    Social,
    /// Nothing recognizable.
    #[default]
    Unknown,
}

impl Intent {
    /// The communication style this intent suggests, if any.
    #[must_use]
    pub fn suggested_style(self) -> Option<CommunicationStyle> {
        match self {
            Self::Greeting => Some(CommunicationStyle::Casual),
            Self::Question => Some(CommunicationStyle::Direct),
            Self::Request => Some(CommunicationStyle::Direct),
            Self::Emotional => Some(CommunicationStyle::Supportive),
            Self::Social => Some(CommunicationStyle::Warm),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Greeting => write!(f, "greeting"),
            Self::Question => write!(f, "question"),
            Self::Request => write!(f, "request"),
            Self::Emotional => write!(f, "emotional"),
            Self::Social => write!(f, "social"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of analyzing the incoming message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageAnalysis {
    /// Dominant intent.
    pub intent: Intent,
    /// Named entities (people, places, things) mentioned in the message.
    #[serde(default)]
    pub entities: Vec<String>,
    /// Sentiment in `[-1.0, 1.0]`.
    #[serde(default)]
    pub sentiment: f64,
    /// Urgency in `[0.0, 1.0]`.
    #[serde(default)]
    pub urgency: f64,
    /// Confidence in the analysis.
    pub confidence: f64,
}

impl MessageAnalysis {
    /// Creates an analysis with the given intent and confidence.
    #[must_use]
    pub fn new(intent: Intent, confidence: f64) -> Self {
        Self {
            intent,
            confidence,
            ..Default::default()
        }
    }

    /// Sets the mentioned entities.
    #[must_use]
    pub fn with_entities(mut self, entities: Vec<String>) -> Self {
        self.entities = entities;
        self
    }

    /// Sets the sentiment.
    #[must_use]
    pub fn with_sentiment(mut self, sentiment: f64) -> Self {
        self.sentiment = sentiment;
        self
    }

    /// Sets the urgency.
    #[must_use]
    pub fn with_urgency(mut self, urgency: f64) -> Self {
        self.urgency = urgency;
        self
    }
}

impl Confidence for MessageAnalysis {
    fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// State of the conversation session the message belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionState {
    /// Session the state was read from.
    pub session_id: String,
    /// Turns seen in this session, including the current one.
    #[serde(default)]
    pub turn_count: u32,
    /// Topics discussed recently.
    #[serde(default)]
    pub active_topics: Vec<String>,
    /// When the previous turn happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interaction: Option<Timestamp>,
    /// Confidence in the state (low for brand-new sessions).
    pub confidence: f64,
}

impl SessionState {
    /// Creates a session state.
    #[must_use]
    pub fn new(session_id: impl Into<String>, turn_count: u32, confidence: f64) -> Self {
        Self {
            session_id: session_id.into(),
            turn_count,
            confidence,
            ..Default::default()
        }
    }

    /// Sets the active topics.
    #[must_use]
    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.active_topics = topics;
        self
    }

    /// Returns true when this is not the first turn.
    #[must_use]
    pub fn is_ongoing(&self) -> bool {
        self.turn_count > 1
    }
}

impl Confidence for SessionState {
    fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// A recalled memory with its relevance to the current message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnippet {
    /// Memory text.
    pub content: String,
    /// Relevance in `[0.0, 1.0]`.
    pub relevance: f64,
}

impl MemorySnippet {
    /// Creates a snippet.
    #[must_use]
    pub fn new(content: impl Into<String>, relevance: f64) -> Self {
        Self {
            content: content.into(),
            relevance,
        }
    }
}

/// Memories recalled for the current message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MemoryView {
    /// Relevant snippets, most relevant first.
    #[serde(default)]
    pub snippets: Vec<MemorySnippet>,
    /// Confidence in the recall.
    pub confidence: f64,
}

impl MemoryView {
    /// Creates a memory view.
    #[must_use]
    pub fn new(snippets: Vec<MemorySnippet>, confidence: f64) -> Self {
        Self {
            snippets,
            confidence,
        }
    }

    /// Returns true if at least one snippet was recalled.
    #[must_use]
    pub fn has_memories(&self) -> bool {
        !self.snippets.is_empty()
    }
}

impl Confidence for MemoryView {
    fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// A known relationship between the user and another person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// The other person.
    pub person: String,
    /// Relationship strength in `[0.0, 1.0]`.
    pub strength: f64,
    /// Style the user prefers when this relationship is in play.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_style: Option<CommunicationStyle>,
}

impl Relationship {
    /// Creates a relationship.
    #[must_use]
    pub fn new(person: impl Into<String>, strength: f64) -> Self {
        Self {
            person: person.into(),
            strength,
            preferred_style: None,
        }
    }

    /// Sets the preferred style.
    #[must_use]
    pub fn with_preferred_style(mut self, style: CommunicationStyle) -> Self {
        self.preferred_style = Some(style);
        self
    }
}

/// Social-graph view for the current message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SocialView {
    /// Strongest relationship relevant to the message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<Relationship>,
    /// People mentioned in the message that the graph knows about.
    #[serde(default)]
    pub known_people: Vec<String>,
    /// Confidence in the lookup.
    pub confidence: f64,
}

impl SocialView {
    /// Creates a social view.
    #[must_use]
    pub fn new(relationship: Option<Relationship>, confidence: f64) -> Self {
        Self {
            relationship,
            known_people: Vec::new(),
            confidence,
        }
    }

    /// Sets the known people.
    #[must_use]
    pub fn with_known_people(mut self, people: Vec<String>) -> Self {
        self.known_people = people;
        self
    }

    /// Style the relationship asks for, if one is known.
    #[must_use]
    pub fn relationship_style(&self) -> Option<CommunicationStyle> {
        self.relationship.as_ref().and_then(|r| r.preferred_style)
    }
}

impl Confidence for SocialView {
    fn confidence(&self) -> f64 {
        self.confidence
    }
}

pub(crate) fn clamp_confidence(value: &mut f64) {
    *value = clamp_unit(*value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_styles() {
        assert_eq!(Intent::Social.suggested_style(), Some(CommunicationStyle::Warm));
        assert_eq!(
            Intent::Emotional.suggested_style(),
            Some(CommunicationStyle::Supportive)
        );
        assert_eq!(Intent::Unknown.suggested_style(), None);
    }

    #[test]
    fn test_intent_serialize() {
        assert_eq!(serde_json::to_string(&Intent::Social).unwrap(), r#""social""#);
        assert_eq!(Intent::Question.to_string(), "question");
    }

    #[test]
    fn test_session_state_ongoing() {
        assert!(!SessionState::new("s1", 1, 0.5).is_ongoing());
        assert!(SessionState::new("s1", 4, 0.9).is_ongoing());
    }

    #[test]
    fn test_social_view_relationship_style() {
        let view = SocialView::new(
            Some(Relationship::new("Ana", 0.9).with_preferred_style(CommunicationStyle::Playful)),
            0.8,
        );
        assert_eq!(view.relationship_style(), Some(CommunicationStyle::Playful));
        assert_eq!(SocialView::default().relationship_style(), None);
    }
}
