//! Synthesis: derive one behavioral profile from all sub-analysis results.

use super::attempt::{run_guarded, StageFailure};
use crate::analysis::{
    CommunicationStyle, Confidence, DerivedProfile, FallbackSet, ResultMap, StyleSource,
    SubAnalysis,
};
use crate::config::{EngineConfig, SynthesisWeights};
use crate::context::{Context, ContextError, Enrichments, ErrorKind};
use crate::errors::StageError;
use crate::events::{names, EventSink};
use crate::trace::{StageOutcome, TraceEntry};
use crate::utils::{clamp_unit, now_utc};
use async_trait::async_trait;
use std::fmt::Debug;
use tracing::{debug, warn};

/// Name under which synthesis appears in traces, logs and errors.
pub const SYNTHESIS_STAGE: &str = "synthesis";

/// Builds a [`DerivedProfile`] from the merged results.
///
/// Implementations must tolerate any entry being a fallback. `fallbacks`
/// names the entries that are.
#[async_trait]
pub trait Synthesizer: Send + Sync + Debug {
    /// Derives the profile.
    async fn synthesize(
        &self,
        results: &ResultMap,
        fallbacks: &FallbackSet,
        ctx: &Context,
    ) -> Result<DerivedProfile, StageError>;
}

/// Outcome of a guarded synthesis step.
#[derive(Debug, Clone)]
pub struct SynthesisRun {
    /// The computed profile, or the fallback profile.
    pub profile: DerivedProfile,
    /// Recoverable error recorded when the fallback was used.
    pub error: Option<ContextError>,
    /// Trace entry for the step.
    pub entry: TraceEntry,
}

impl SynthesisRun {
    /// Returns true if the profile was computed rather than substituted.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs `synthesizer` without a timeout, substituting the fallback profile
/// on error, panic, or an out-of-range profile. Never fails.
pub async fn synthesize_guarded(
    synthesizer: &dyn Synthesizer,
    results: &ResultMap,
    fallbacks: &FallbackSet,
    ctx: &Context,
    sink: &dyn EventSink,
) -> SynthesisRun {
    let started_at = now_utc();
    let outcome = run_guarded(synthesizer.synthesize(results, fallbacks, ctx), None)
        .await
        .and_then(|profile| {
            if profile.is_in_range() {
                Ok(profile)
            } else {
                Err(StageFailure::failed(&StageError::failed(
                    "synthesized profile is out of range",
                )))
            }
        });
    let ended_at = now_utc();

    match outcome {
        Ok(profile) => {
            debug!(style = %profile.communication_style, signals = ?profile.signals, "Synthesis completed");
            SynthesisRun {
                profile,
                error: None,
                entry: TraceEntry::new(SYNTHESIS_STAGE, started_at, ended_at, StageOutcome::Completed),
            }
        }
        Err(failure) => {
            warn!(error = %failure.message, "Synthesis failed; using fallback profile");
            sink.try_emit(
                names::SYNTHESIS_FALLBACK,
                Some(serde_json::json!({"error": failure.message})),
            );
            let outcome = failure.outcome;
            SynthesisRun {
                profile: DerivedProfile::fallback(),
                error: Some(ContextError::new(
                    SYNTHESIS_STAGE,
                    failure.message,
                    ErrorKind::SynthesisFailure,
                    true,
                )),
                entry: TraceEntry::new(SYNTHESIS_STAGE, started_at, ended_at, outcome),
            }
        }
    }
}

/// Weighted-confidence synthesizer.
///
/// * Style: a relationship-level preference from a social result wins, then
///   the style suggested by the message intent, then `adaptive`.
/// * `confidence_level`: weighted mean of every result's confidence.
/// * `adaptation_level`: a base plus increments for recalled memories, a
///   known relationship, an ongoing session and mentioned entities, capped.
/// * `synthesis_confidence`: `0.7 * mean + 0.3 * max` plus a small bonus per
///   genuine signal, never above `max + bonus`.
///
/// Every entry not named in the fallback set counts as a genuine signal,
/// whatever its confidence.
#[derive(Debug, Clone)]
pub struct ProfileSynthesizer {
    weights: SynthesisWeights,
}

impl Default for ProfileSynthesizer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ProfileSynthesizer {
    /// Creates a synthesizer from explicit weights.
    #[must_use]
    pub fn new(weights: SynthesisWeights) -> Self {
        Self { weights }
    }

    /// Creates a synthesizer from the engine configuration.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.synthesis.clone())
    }

    fn weight(&self, result: &SubAnalysis) -> f64 {
        match result {
            SubAnalysis::Message(_) => self.weights.message,
            SubAnalysis::Session(_) => self.weights.session,
            SubAnalysis::Memory(_) => self.weights.memory,
            SubAnalysis::Social(_) => self.weights.social,
            SubAnalysis::Custom { .. } => self.weights.custom,
        }
    }

    /// Derives a profile. Pure and infallible.
    #[must_use]
    pub fn profile(&self, results: &ResultMap, fallbacks: &FallbackSet) -> DerivedProfile {
        let genuine: Vec<(&String, &SubAnalysis)> = results
            .iter()
            .filter(|(name, _)| !fallbacks.contains(name.as_str()))
            .collect();

        let relationship_style = genuine
            .iter()
            .find_map(|(_, r)| r.as_social().and_then(|s| s.relationship_style()));
        let intent_style = genuine
            .iter()
            .find_map(|(_, r)| r.as_message().and_then(|m| m.intent.suggested_style()));
        let (communication_style, style_source) = match (relationship_style, intent_style) {
            (Some(style), _) => (style, StyleSource::Relationship),
            (None, Some(style)) => (style, StyleSource::Intent),
            (None, None) => (CommunicationStyle::Adaptive, StyleSource::Default),
        };

        let (weighted, total_weight) = results.values().fold((0.0, 0.0), |(sum, total), r| {
            let w = self.weight(r);
            (sum + w * clamp_unit(r.confidence()), total + w)
        });
        let confidence_level = if total_weight > 0.0 {
            clamp_unit(weighted / total_weight)
        } else {
            0.0
        };

        let w = &self.weights;
        let mut adaptation = w.base_adaptation;
        if genuine.iter().any(|(_, r)| r.as_memory().is_some_and(|m| m.has_memories())) {
            adaptation += w.memory_adaptation;
        }
        if genuine.iter().any(|(_, r)| r.as_social().is_some_and(|s| s.relationship.is_some())) {
            adaptation += w.relationship_adaptation;
        }
        if genuine.iter().any(|(_, r)| r.as_session().is_some_and(|s| s.is_ongoing())) {
            adaptation += w.session_adaptation;
        }
        if genuine.iter().any(|(_, r)| r.as_message().is_some_and(|m| !m.entities.is_empty())) {
            adaptation += w.entity_adaptation;
        }
        let adaptation_level = clamp_unit(adaptation.min(w.max_adaptation));

        let synthesis_confidence = if results.is_empty() {
            0.0
        } else {
            let confidences: Vec<f64> = results.values().map(|r| clamp_unit(r.confidence())).collect();
            let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
            let max = confidences.iter().copied().fold(0.0, f64::max);
            let bonus = (w.signal_bonus * genuine.len() as f64).min(w.max_signal_bonus);
            clamp_unit((0.7 * mean + 0.3 * max + bonus).min(max + bonus))
        };

        DerivedProfile {
            communication_style,
            style_source,
            confidence_level,
            adaptation_level,
            synthesis_confidence,
            signals: genuine.iter().map(|(name, _)| (*name).clone()).collect(),
        }
    }
}

#[async_trait]
impl Synthesizer for ProfileSynthesizer {
    async fn synthesize(
        &self,
        results: &ResultMap,
        fallbacks: &FallbackSet,
        _ctx: &Context,
    ) -> Result<DerivedProfile, StageError> {
        Ok(self.profile(results, fallbacks))
    }
}

/// Views the populated enrichment slots as a result map keyed by slot name.
#[must_use]
pub fn results_from_enrichments(enrichments: &Enrichments) -> ResultMap {
    let mut results = ResultMap::new();
    if let Some(a) = &enrichments.analysis {
        results.insert("analysis".to_string(), SubAnalysis::Message(a.clone()));
    }
    if let Some(s) = &enrichments.session_state {
        results.insert("session_state".to_string(), SubAnalysis::Session(s.clone()));
    }
    if let Some(m) = &enrichments.memory_view {
        results.insert("memory_view".to_string(), SubAnalysis::Memory(m.clone()));
    }
    if let Some(s) = &enrichments.social_view {
        results.insert("social_view".to_string(), SubAnalysis::Social(s.clone()));
    }
    results
}
