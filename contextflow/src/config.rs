//! Engine configuration.
//!
//! All fields have defaults, so an empty JSON object is a valid
//! configuration.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Configuration shared by the engines, the synthesizer and the reference stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on the confidence of a fallback result.
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f64,
    /// Timeout used by concurrent stages that have no override.
    #[serde(default = "default_stage_timeout_ms")]
    pub default_stage_timeout_ms: u64,
    /// Per-stage timeout overrides, keyed by stage name.
    #[serde(default)]
    pub stage_timeouts_ms: HashMap<String, u64>,
    /// Synthesis weights.
    #[serde(default)]
    pub synthesis: SynthesisWeights,
    /// Maximum number of memories recalled per run.
    #[serde(default = "default_memory_top_k")]
    pub memory_top_k: usize,
    /// Minimum relevance for a memory to be recalled.
    #[serde(default = "default_memory_relevance_threshold")]
    pub memory_relevance_threshold: f64,
}

fn default_fallback_confidence() -> f64 {
    crate::analysis::FALLBACK_CONFIDENCE
}

fn default_stage_timeout_ms() -> u64 {
    5_000
}

fn default_memory_top_k() -> usize {
    3
}

fn default_memory_relevance_threshold() -> f64 {
    0.2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_confidence: default_fallback_confidence(),
            default_stage_timeout_ms: default_stage_timeout_ms(),
            stage_timeouts_ms: HashMap::new(),
            synthesis: SynthesisWeights::default(),
            memory_top_k: default_memory_top_k(),
            memory_relevance_threshold: default_memory_relevance_threshold(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Sets the fallback confidence cap.
    #[must_use]
    pub fn with_fallback_confidence(mut self, value: f64) -> Self {
        self.fallback_confidence = value;
        self
    }

    /// Sets the default concurrent stage timeout.
    #[must_use]
    pub fn with_default_stage_timeout(mut self, timeout: Duration) -> Self {
        self.default_stage_timeout_ms = duration_to_ms(timeout);
        self
    }

    /// Overrides the timeout of one stage.
    #[must_use]
    pub fn with_stage_timeout(mut self, stage: impl Into<String>, timeout: Duration) -> Self {
        self.stage_timeouts_ms.insert(stage.into(), duration_to_ms(timeout));
        self
    }

    /// Sets the synthesis weights.
    #[must_use]
    pub fn with_synthesis(mut self, weights: SynthesisWeights) -> Self {
        self.synthesis = weights;
        self
    }

    /// Timeout for `stage`: its override, else `default`, else the configured default.
    #[must_use]
    pub fn timeout_for(&self, stage: &str, default: Option<Duration>) -> Duration {
        self.stage_timeout(stage)
            .or(default)
            .unwrap_or_else(|| Duration::from_millis(self.default_stage_timeout_ms))
    }

    /// The configured override for `stage`, if any.
    #[must_use]
    pub fn stage_timeout(&self, stage: &str) -> Option<Duration> {
        self.stage_timeouts_ms.get(stage).map(|ms| Duration::from_millis(*ms))
    }

    /// Checks every field is within range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("fallback_confidence", self.fallback_confidence)?;
        check_unit("memory_relevance_threshold", self.memory_relevance_threshold)?;

        if self.default_stage_timeout_ms == 0 {
            return Err(ConfigError::out_of_range(
                "default_stage_timeout_ms",
                "must be greater than zero",
            ));
        }
        if let Some((stage, _)) = self.stage_timeouts_ms.iter().find(|(_, ms)| **ms == 0) {
            return Err(ConfigError::out_of_range(
                format!("stage_timeouts_ms.{stage}"),
                "must be greater than zero",
            ));
        }
        if self.memory_top_k == 0 {
            return Err(ConfigError::out_of_range("memory_top_k", "must be at least 1"));
        }

        self.synthesis.validate()
    }
}

/// Weights and bounds used when synthesizing a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisWeights {
    /// Weight of the message analysis confidence.
    #[serde(default = "default_message_weight")]
    pub message: f64,
    /// Weight of the session analysis confidence.
    #[serde(default = "default_context_weight")]
    pub session: f64,
    /// Weight of the memory analysis confidence.
    #[serde(default = "default_context_weight")]
    pub memory: f64,
    /// Weight of the social analysis confidence.
    #[serde(default = "default_context_weight")]
    pub social: f64,
    /// Weight of any custom result.
    #[serde(default = "default_custom_weight")]
    pub custom: f64,
    /// Bonus added to synthesis confidence per genuine signal.
    #[serde(default = "default_signal_bonus")]
    pub signal_bonus: f64,
    /// Cap on the total signal bonus.
    #[serde(default = "default_max_signal_bonus")]
    pub max_signal_bonus: f64,
    /// Adaptation level with no context at all.
    #[serde(default = "default_base_adaptation")]
    pub base_adaptation: f64,
    /// Added when memories were recalled.
    #[serde(default = "default_rich_adaptation")]
    pub memory_adaptation: f64,
    /// Added when a relationship is known.
    #[serde(default = "default_rich_adaptation")]
    pub relationship_adaptation: f64,
    /// Added when the session is ongoing.
    #[serde(default = "default_light_adaptation")]
    pub session_adaptation: f64,
    /// Added when the message mentions entities.
    #[serde(default = "default_light_adaptation")]
    pub entity_adaptation: f64,
    /// Cap on the adaptation level.
    #[serde(default = "default_max_adaptation")]
    pub max_adaptation: f64,
}

fn default_message_weight() -> f64 {
    0.4
}

fn default_context_weight() -> f64 {
    0.2
}

fn default_custom_weight() -> f64 {
    0.1
}

fn default_signal_bonus() -> f64 {
    0.05
}

fn default_max_signal_bonus() -> f64 {
    0.1
}

fn default_base_adaptation() -> f64 {
    0.3
}

fn default_rich_adaptation() -> f64 {
    0.2
}

fn default_light_adaptation() -> f64 {
    0.1
}

fn default_max_adaptation() -> f64 {
    0.9
}

impl Default for SynthesisWeights {
    fn default() -> Self {
        Self {
            message: default_message_weight(),
            session: default_context_weight(),
            memory: default_context_weight(),
            social: default_context_weight(),
            custom: default_custom_weight(),
            signal_bonus: default_signal_bonus(),
            max_signal_bonus: default_max_signal_bonus(),
            base_adaptation: default_base_adaptation(),
            memory_adaptation: default_rich_adaptation(),
            relationship_adaptation: default_rich_adaptation(),
            session_adaptation: default_light_adaptation(),
            entity_adaptation: default_light_adaptation(),
            max_adaptation: default_max_adaptation(),
        }
    }
}

impl SynthesisWeights {
    /// Checks every weight is within `[0, 1]` and at least one result weight is positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("synthesis.message", self.message),
            ("synthesis.session", self.session),
            ("synthesis.memory", self.memory),
            ("synthesis.social", self.social),
            ("synthesis.custom", self.custom),
            ("synthesis.signal_bonus", self.signal_bonus),
            ("synthesis.max_signal_bonus", self.max_signal_bonus),
            ("synthesis.base_adaptation", self.base_adaptation),
            ("synthesis.memory_adaptation", self.memory_adaptation),
            ("synthesis.relationship_adaptation", self.relationship_adaptation),
            ("synthesis.session_adaptation", self.session_adaptation),
            ("synthesis.entity_adaptation", self.entity_adaptation),
            ("synthesis.max_adaptation", self.max_adaptation),
        ] {
            check_unit(field, value)?;
        }

        if self.message + self.session + self.memory + self.social + self.custom <= 0.0 {
            return Err(ConfigError::out_of_range(
                "synthesis",
                "at least one result weight must be positive",
            ));
        }
        Ok(())
    }
}

fn check_unit(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::out_of_range(field, format!("{value} is not in [0, 1]")))
    }
}

/// Whole milliseconds, rounding a non-zero sub-millisecond remainder up so a
/// non-zero duration never becomes zero.
fn duration_to_ms(duration: Duration) -> u64 {
    let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    if duration.subsec_nanos() % 1_000_000 == 0 {
        ms
    } else {
        ms.saturating_add(1)
    }
}
