//! Profile synthesis as a sequential stage.

use crate::analysis::FallbackSet;
use crate::context::Context;
use crate::errors::StageError;
use crate::pipeline::{results_from_enrichments, ProfileSynthesizer};
use crate::stages::Stage;
use async_trait::async_trait;

/// Fills the derived-profile slot from whatever slots earlier stages populated.
///
/// A failed sequential stage leaves its slot empty, so every populated slot
/// counts as a genuine signal.
#[derive(Debug, Clone, Default)]
pub struct PersonalityStage {
    synthesizer: ProfileSynthesizer,
}

impl PersonalityStage {
    /// Creates a stage using `synthesizer`.
    #[must_use]
    pub fn new(synthesizer: ProfileSynthesizer) -> Self {
        Self { synthesizer }
    }
}

#[async_trait]
impl Stage for PersonalityStage {
    async fn run(&self, ctx: Context) -> Result<Context, StageError> {
        let results = results_from_enrichments(ctx.enrichments());
        if results.is_empty() {
            return Err(StageError::missing_input("no enrichment slots are populated"));
        }
        let profile = self.synthesizer.profile(&results, &FallbackSet::new());
        Ok(ctx.with_derived_profile(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CommunicationStyle, Intent, MessageAnalysis, StyleSource};

    #[tokio::test]
    async fn test_profile_from_slots() {
        let ctx = Context::new("What now?", "s", "u")
            .with_analysis(MessageAnalysis::new(Intent::Question, 0.8));
        let out = PersonalityStage::default().run(ctx).await.unwrap();

        let profile = out.derived_profile().unwrap();
        assert_eq!(profile.communication_style, CommunicationStyle::Direct);
        assert_eq!(profile.style_source, StyleSource::Intent);
        assert_eq!(profile.signals, vec!["analysis"]);
    }

    #[tokio::test]
    async fn test_requires_some_input() {
        let err = PersonalityStage::default()
            .run(Context::new("hi", "s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::MissingInput(_)));
    }
}
