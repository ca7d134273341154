//! Testing utilities for contextflow pipelines.
//!
//! This module provides:
//! - Mock stages for both scheduling modes
//! - Assertions over runs, error lists and profiles
//! - Context builders, seeded collaborators and sample result maps

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_error_kind, assert_error_recorded, assert_no_errors, assert_profile_in_range,
    assert_run_failed, assert_run_succeeded, assert_unit_range,
};
pub use fixtures::{
    fallback_names, fallback_results, sample_results, seeded_collaborators, TestContext,
};
pub use mocks::{
    FailingStage, PanickingStage, RecordedCall, RecordingStage, SlowStage, StaticAnalysis,
    StaticStage,
};
