//! Relationship lookup for the people a message mentions.

use super::message::KeywordMessageAnalyzer;
use crate::analysis::{Relationship, SocialView, SubAnalysis};
use crate::context::Context;
use crate::errors::StageError;
use crate::stages::{AnalysisStage, Stage};
use crate::utils::clamp_unit;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Source of a user's known relationships.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelationshipProvider: Send + Sync {
    /// All relationships known for `user_id`.
    async fn relationships(&self, user_id: &str) -> Result<Vec<Relationship>, StageError>;
}

/// A [`RelationshipProvider`] held in a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryRelationshipProvider {
    relationships: DashMap<String, Vec<Relationship>>,
}

impl InMemoryRelationshipProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the relationship with `relationship.person`.
    pub fn add(&self, user_id: &str, relationship: Relationship) {
        let mut known = self.relationships.entry(user_id.to_string()).or_default();
        known.retain(|r| !r.person.eq_ignore_ascii_case(&relationship.person));
        known.push(relationship);
    }
}

#[async_trait]
impl RelationshipProvider for InMemoryRelationshipProvider {
    async fn relationships(&self, user_id: &str) -> Result<Vec<Relationship>, StageError> {
        Ok(self
            .relationships
            .get(user_id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }
}

/// Finds the strongest known relationship among the people mentioned.
///
/// Mentions come from the analysis slot when present, otherwise from the
/// message text directly, so the stage works before message analysis has run.
pub struct SocialLookupStage {
    provider: Arc<dyn RelationshipProvider>,
}

impl std::fmt::Debug for SocialLookupStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocialLookupStage").finish_non_exhaustive()
    }
}

impl SocialLookupStage {
    /// Creates a stage reading from `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn RelationshipProvider>) -> Self {
        Self { provider }
    }

    async fn lookup(&self, ctx: &Context) -> Result<SocialView, StageError> {
        let mentioned = match ctx.analysis() {
            Some(analysis) => analysis.entities.clone(),
            None => KeywordMessageAnalyzer.analyze_text(ctx.message()).entities,
        };

        let known = self.provider.relationships(ctx.user_id()).await?;
        if known.is_empty() {
            return Ok(SocialView::new(None, 0.3));
        }

        let matched: Vec<&Relationship> = known
            .iter()
            .filter(|r| mentioned.iter().any(|m| m.eq_ignore_ascii_case(&r.person)))
            .collect();

        let strongest = matched
            .iter()
            .max_by(|a, b| {
                a.strength
                    .total_cmp(&b.strength)
                    .then_with(|| b.person.cmp(&a.person))
            })
            .map(|r| (*r).clone());

        let confidence = strongest
            .as_ref()
            .map_or(0.4, |r| clamp_unit(0.5 + 0.5 * r.strength));
        let people = matched.iter().map(|r| r.person.clone()).collect();

        Ok(SocialView::new(strongest, confidence).with_known_people(people))
    }
}

#[async_trait]
impl AnalysisStage for SocialLookupStage {
    async fn analyze(&self, ctx: &Context) -> Result<SubAnalysis, StageError> {
        self.lookup(ctx).await.map(SubAnalysis::Social)
    }
}

#[async_trait]
impl Stage for SocialLookupStage {
    async fn run(&self, ctx: Context) -> Result<Context, StageError> {
        let view = self.lookup(&ctx).await?;
        Ok(ctx.with_social_view(view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CommunicationStyle, Intent, MessageAnalysis};

    fn provider() -> Arc<InMemoryRelationshipProvider> {
        let provider = InMemoryRelationshipProvider::new();
        provider.add(
            "u1",
            Relationship::new("Ana", 0.9).with_preferred_style(CommunicationStyle::Playful),
        );
        provider.add("u1", Relationship::new("Marco", 0.4));
        Arc::new(provider)
    }

    #[tokio::test]
    async fn test_picks_strongest_mentioned() {
        let stage = SocialLookupStage::new(provider());
        let ctx = Context::new("Lunch with Marco and Ana?", "s", "u1");

        let view = stage.lookup(&ctx).await.unwrap();
        assert_eq!(view.relationship.as_ref().unwrap().person, "Ana");
        assert_eq!(view.relationship_style(), Some(CommunicationStyle::Playful));
        assert_eq!(view.known_people.len(), 2);
        assert!((view.confidence - 0.95).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_prefers_analysis_entities() {
        let stage = SocialLookupStage::new(provider());
        let ctx = Context::new("Lunch with Ana", "s", "u1").with_analysis(
            MessageAnalysis::new(Intent::Social, 0.8).with_entities(vec!["marco".into()]),
        );

        let view = stage.lookup(&ctx).await.unwrap();
        assert_eq!(view.relationship.unwrap().person, "Marco");
    }

    #[tokio::test]
    async fn test_nobody_mentioned() {
        let stage = SocialLookupStage::new(provider());
        let view = stage.lookup(&Context::new("hello there", "s", "u1")).await.unwrap();
        assert!(view.relationship.is_none());
        assert!((view.confidence - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_add_replaces_existing() {
        let provider = InMemoryRelationshipProvider::new();
        provider.add("u", Relationship::new("Ana", 0.2));
        provider.add("u", Relationship::new("ana", 0.7));
        let known = provider.relationships("u").await.unwrap();
        assert_eq!(known.len(), 1);
        assert!((known[0].strength - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_provider_failure() {
        let mut mock = MockRelationshipProvider::new();
        mock.expect_relationships()
            .returning(|_| Err(StageError::failed("graph offline")));
        let stage = SocialLookupStage::new(Arc::new(mock));
        assert!(stage.run(Context::new("hi Ana", "s", "u")).await.is_err());
    }
}
