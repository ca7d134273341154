//! The derived behavioral profile and its style classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the agent should phrase its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationStyle {
    /// No strong signal; mirror the user.
    #[default]
    Adaptive,
    /// Neutral register used when synthesis could not run.
    Balanced,
    /// Relaxed and informal.
    Casual,
    /// Friendly and personal.
    Warm,
    /// Gentle, empathetic.
    Supportive,
    /// Short and to the point.
    Direct,
    /// Polite and structured.
    Formal,
    /// Light-hearted.
    Playful,
}

impl fmt::Display for CommunicationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adaptive => write!(f, "adaptive"),
            Self::Balanced => write!(f, "balanced"),
            Self::Casual => write!(f, "casual"),
            Self::Warm => write!(f, "warm"),
            Self::Supportive => write!(f, "supportive"),
            Self::Direct => write!(f, "direct"),
            Self::Formal => write!(f, "formal"),
            Self::Playful => write!(f, "playful"),
        }
    }
}

/// Where the chosen communication style came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleSource {
    /// A relationship-level preference from the social analysis.
    Relationship,
    /// Inferred from the message intent.
    Intent,
    /// No signal; the adaptive default.
    Default,
    /// Synthesis failed and the fallback profile was used.
    Fallback,
}

/// Confidence of the substituted profile when synthesis fails.
pub const FALLBACK_PROFILE_CONFIDENCE: f64 = 0.8;

/// The synthesizer's output.
///
/// Either fully computed or the documented [`DerivedProfile::fallback`];
/// never partially populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedProfile {
    /// Chosen style.
    pub communication_style: CommunicationStyle,
    /// Which signal decided the style.
    pub style_source: StyleSource,
    /// Weighted combination of sub-analysis confidences.
    pub confidence_level: f64,
    /// How much the reply should adapt to known context.
    pub adaptation_level: f64,
    /// Confidence in the synthesis itself.
    pub synthesis_confidence: f64,
    /// Names of the results that contributed a genuine signal.
    #[serde(default)]
    pub signals: Vec<String>,
}

impl DerivedProfile {
    /// The profile substituted when synthesis fails.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            communication_style: CommunicationStyle::Balanced,
            style_source: StyleSource::Fallback,
            confidence_level: FALLBACK_PROFILE_CONFIDENCE,
            adaptation_level: 0.5,
            synthesis_confidence: FALLBACK_PROFILE_CONFIDENCE,
            signals: Vec::new(),
        }
    }

    /// Returns true if this is the fallback profile.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.style_source == StyleSource::Fallback
    }

    /// Returns true if every numeric field is within `[0.0, 1.0]`.
    #[must_use]
    pub fn is_in_range(&self) -> bool {
        [
            self.confidence_level,
            self.adaptation_level,
            self.synthesis_confidence,
        ]
        .iter()
        .all(|v| (0.0..=1.0).contains(v))
    }
}
