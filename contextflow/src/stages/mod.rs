//! Stage traits and adapters.
//!
//! A sequential stage takes the running [`Context`] by value and returns the
//! next one. A concurrent stage borrows a shared, read-only context and
//! returns one [`SubAnalysis`]. Stage names live on the descriptors, not on
//! the stages, so one implementation can be registered under several names.

pub mod builtin;

use crate::analysis::SubAnalysis;
use crate::context::Context;
use crate::errors::StageError;
use async_trait::async_trait;
use std::fmt::Debug;

/// A stage in a sequential pipeline.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Runs the stage on a snapshot of the running context.
    ///
    /// Only enrichment slots of the returned context are merged back.
    async fn run(&self, ctx: Context) -> Result<Context, StageError>;
}

/// A stage in a concurrent fan-out.
#[async_trait]
pub trait AnalysisStage: Send + Sync + Debug {
    /// Produces this stage's result from the shared context.
    async fn analyze(&self, ctx: &Context) -> Result<SubAnalysis, StageError>;
}

/// A sequential stage backed by a closure.
pub struct FnStage<F>
where
    F: Fn(Context) -> Result<Context, StageError> + Send + Sync,
{
    label: String,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(Context) -> Result<Context, StageError> + Send + Sync,
{
    /// Creates a closure-backed stage. `label` is only used for `Debug`.
    pub fn new(label: impl Into<String>, func: F) -> Self {
        Self {
            label: label.into(),
            func,
        }
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(Context) -> Result<Context, StageError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage").field("label", &self.label).finish()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(Context) -> Result<Context, StageError> + Send + Sync,
{
    async fn run(&self, ctx: Context) -> Result<Context, StageError> {
        (self.func)(ctx)
    }
}

/// A concurrent stage backed by a closure.
pub struct FnAnalysisStage<F>
where
    F: Fn(&Context) -> Result<SubAnalysis, StageError> + Send + Sync,
{
    label: String,
    func: F,
}

impl<F> FnAnalysisStage<F>
where
    F: Fn(&Context) -> Result<SubAnalysis, StageError> + Send + Sync,
{
    /// Creates a closure-backed analysis stage. `label` is only used for `Debug`.
    pub fn new(label: impl Into<String>, func: F) -> Self {
        Self {
            label: label.into(),
            func,
        }
    }
}

impl<F> Debug for FnAnalysisStage<F>
where
    F: Fn(&Context) -> Result<SubAnalysis, StageError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAnalysisStage")
            .field("label", &self.label)
            .finish()
    }
}

#[async_trait]
impl<F> AnalysisStage for FnAnalysisStage<F>
where
    F: Fn(&Context) -> Result<SubAnalysis, StageError> + Send + Sync,
{
    async fn analyze(&self, ctx: &Context) -> Result<SubAnalysis, StageError> {
        (self.func)(ctx)
    }
}

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpStage;

#[async_trait]
impl Stage for NoOpStage {
    async fn run(&self, ctx: Context) -> Result<Context, StageError> {
        Ok(ctx)
    }
}
