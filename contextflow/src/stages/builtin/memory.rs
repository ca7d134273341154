//! Memory recall by token overlap.

use crate::analysis::{MemorySnippet, MemoryView, SubAnalysis};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::errors::StageError;
use crate::stages::{AnalysisStage, Stage};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Source of a user's stored memories.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemoryProvider: Send + Sync {
    /// All memories stored for `user_id`.
    async fn memories(&self, user_id: &str) -> Result<Vec<String>, StageError>;
}

/// A [`MemoryProvider`] held in a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryMemoryProvider {
    memories: DashMap<String, Vec<String>>,
}

impl InMemoryMemoryProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a memory for a user.
    pub fn remember(&self, user_id: &str, content: impl Into<String>) {
        self.memories
            .entry(user_id.to_string())
            .or_default()
            .push(content.into());
    }
}

#[async_trait]
impl MemoryProvider for InMemoryMemoryProvider {
    async fn memories(&self, user_id: &str) -> Result<Vec<String>, StageError> {
        Ok(self
            .memories
            .get(user_id)
            .map(|m| m.value().clone())
            .unwrap_or_default())
    }
}

/// Recalls the memories most relevant to the message.
///
/// Relevance is the share of query tokens (message words of three or more
/// letters, plus analyzed entities when available) that appear in the memory.
pub struct MemoryRecallStage {
    provider: Arc<dyn MemoryProvider>,
    top_k: usize,
    threshold: f64,
}

impl std::fmt::Debug for MemoryRecallStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRecallStage")
            .field("top_k", &self.top_k)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl MemoryRecallStage {
    /// Creates a stage keeping up to `top_k` memories with relevance of at least `threshold`.
    #[must_use]
    pub fn new(provider: Arc<dyn MemoryProvider>, top_k: usize, threshold: f64) -> Self {
        Self {
            provider,
            top_k,
            threshold,
        }
    }

    /// Creates a stage using the configured top-k and threshold.
    #[must_use]
    pub fn from_config(provider: Arc<dyn MemoryProvider>, config: &EngineConfig) -> Self {
        Self::new(provider, config.memory_top_k, config.memory_relevance_threshold)
    }

    async fn recall(&self, ctx: &Context) -> Result<MemoryView, StageError> {
        let stored = self.provider.memories(ctx.user_id()).await?;
        let query = query_tokens(ctx);
        if query.is_empty() {
            return Ok(MemoryView::new(Vec::new(), 0.4));
        }

        let mut scored: Vec<MemorySnippet> = stored
            .into_iter()
            .filter_map(|content| {
                let tokens = tokenize(&content);
                let overlap = query.iter().filter(|q| tokens.contains(*q)).count();
                let relevance = overlap as f64 / query.len() as f64;
                (overlap > 0 && relevance >= self.threshold)
                    .then(|| MemorySnippet::new(content, relevance))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.relevance
                .total_cmp(&a.relevance)
                .then_with(|| a.content.cmp(&b.content))
        });
        scored.truncate(self.top_k);

        let confidence = scored
            .first()
            .map_or(0.4, |best| (0.5 + 0.5 * best.relevance).min(0.95));
        Ok(MemoryView::new(scored, confidence))
    }
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

fn query_tokens(ctx: &Context) -> BTreeSet<String> {
    let mut tokens = tokenize(ctx.message());
    if let Some(analysis) = ctx.analysis() {
        tokens.extend(analysis.entities.iter().map(|e| e.to_lowercase()));
    }
    tokens
}

#[async_trait]
impl AnalysisStage for MemoryRecallStage {
    async fn analyze(&self, ctx: &Context) -> Result<SubAnalysis, StageError> {
        self.recall(ctx).await.map(SubAnalysis::Memory)
    }
}

#[async_trait]
impl Stage for MemoryRecallStage {
    async fn run(&self, ctx: Context) -> Result<Context, StageError> {
        let view = self.recall(&ctx).await?;
        Ok(ctx.with_memory_view(view))
    }
}
