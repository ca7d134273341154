//! Lexicon-based message analysis.

use crate::analysis::{Intent, MessageAnalysis, SubAnalysis};
use crate::context::Context;
use crate::errors::StageError;
use crate::stages::{AnalysisStage, Stage};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z']+").expect("valid regex"));

/// Capitalized words, candidates for named entities.
static CAPITALIZED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+\b").expect("valid regex"));

static QUESTION_OPENER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(what|why|how|when|where|who|which|is|are|do|does|did|can|could|should|will)\b")
        .expect("valid regex")
});

const GREETING: &[&str] = &["hi", "hello", "hey", "morning", "evening", "howdy", "yo", "greetings"];
const REQUEST: &[&str] = &["please", "help", "need", "remind", "book", "send", "schedule", "find"];
const EMOTIONAL: &[&str] = &[
    "sad", "happy", "angry", "anxious", "stressed", "upset", "excited", "worried", "lonely",
    "tired", "scared", "miss", "love", "hate", "feel", "feeling",
];
const SOCIAL: &[&str] = &[
    "dinner", "lunch", "coffee", "party", "friend", "friends", "meet", "hang", "together",
    "date", "birthday", "family",
];
const POSITIVE: &[&str] = &[
    "happy", "great", "love", "excited", "thanks", "good", "awesome", "glad", "wonderful",
];
const NEGATIVE: &[&str] = &[
    "sad", "angry", "hate", "upset", "worried", "bad", "terrible", "lonely", "anxious", "stressed",
];
const URGENT: &[&str] = &["urgent", "asap", "now", "immediately", "quickly", "emergency", "tonight"];

/// Words that are capitalized for reasons other than being a name.
const NOT_ENTITIES: &[&str] = &["Please", "Thanks", "Hi", "Hello", "Hey", "Today", "Tomorrow"];

/// Classifies intent and extracts simple signals from the message text.
///
/// Intent is the category with the most lexicon hits; ties go to the
/// category listed first in [`KeywordMessageAnalyzer::PRIORITY`]. A trailing
/// `?` or a question opener counts as one question hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordMessageAnalyzer;

impl KeywordMessageAnalyzer {
    /// Tie-break order between intents.
    pub const PRIORITY: [Intent; 5] = [
        Intent::Emotional,
        Intent::Request,
        Intent::Question,
        Intent::Social,
        Intent::Greeting,
    ];

    /// Creates an analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Analyzes one message.
    #[must_use]
    pub fn analyze_text(&self, message: &str) -> MessageAnalysis {
        let words: Vec<String> = WORD_RE
            .find_iter(message)
            .map(|m| m.as_str().to_lowercase().replace('\'', ""))
            .collect();
        let hits = |lexicon: &[&str]| words.iter().filter(|w| lexicon.contains(&w.as_str())).count();

        let question_hits = usize::from(message.trim_end().ends_with('?'))
            + usize::from(QUESTION_OPENER_RE.is_match(message));

        let mut best = (Intent::Unknown, 0usize);
        for intent in Self::PRIORITY {
            let count = match intent {
                Intent::Emotional => hits(EMOTIONAL),
                Intent::Request => hits(REQUEST),
                Intent::Question => question_hits,
                Intent::Social => hits(SOCIAL),
                Intent::Greeting => hits(GREETING),
                Intent::Unknown => 0,
            };
            if count > best.1 {
                best = (intent, count);
            }
        }

        let (intent, count) = best;
        let confidence = if intent == Intent::Unknown {
            0.3
        } else {
            (0.5 + 0.15 * count as f64).min(0.95)
        };

        let positive = hits(POSITIVE) as f64;
        let negative = hits(NEGATIVE) as f64;
        let sentiment = if positive + negative > 0.0 {
            (positive - negative) / (positive + negative)
        } else {
            0.0
        };

        let exclamations = message.matches('!').count() as f64;
        let urgency = (0.3 * hits(URGENT) as f64 + 0.1 * exclamations).min(1.0);

        MessageAnalysis::new(intent, confidence)
            .with_entities(extract_entities(message))
            .with_sentiment(sentiment)
            .with_urgency(urgency)
    }
}

/// Capitalized words that do not start a sentence, deduplicated in order.
fn extract_entities(message: &str) -> Vec<String> {
    let mut entities: Vec<String> = Vec::new();
    for m in CAPITALIZED_RE.find_iter(message) {
        let before = message[..m.start()].trim_end();
        let starts_sentence = before.is_empty() || before.ends_with(['.', '!', '?']);
        let word = m.as_str();
        if starts_sentence || NOT_ENTITIES.contains(&word) {
            continue;
        }
        if !entities.iter().any(|e| e == word) {
            entities.push(word.to_string());
        }
    }
    entities
}

#[async_trait]
impl AnalysisStage for KeywordMessageAnalyzer {
    async fn analyze(&self, ctx: &Context) -> Result<SubAnalysis, StageError> {
        if ctx.message().trim().is_empty() {
            return Err(StageError::missing_input("message text"));
        }
        Ok(SubAnalysis::Message(self.analyze_text(ctx.message())))
    }
}

#[async_trait]
impl Stage for KeywordMessageAnalyzer {
    async fn run(&self, ctx: Context) -> Result<Context, StageError> {
        if ctx.message().trim().is_empty() {
            return Err(StageError::missing_input("message text"));
        }
        let analysis = self.analyze_text(ctx.message());
        Ok(ctx.with_analysis(analysis))
    }
}
