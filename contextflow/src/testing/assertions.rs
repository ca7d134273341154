//! Test assertions for pipeline runs.

use crate::analysis::DerivedProfile;
use crate::context::{Context, ErrorKind};
use crate::pipeline::PipelineRun;

/// Asserts that the run succeeded.
pub fn assert_run_succeeded(run: &PipelineRun) {
    assert!(
        run.success,
        "Expected success, got errors: {:?}",
        run.context.errors()
    );
}

/// Asserts that the run failed.
pub fn assert_run_failed(run: &PipelineRun) {
    assert!(
        !run.success,
        "Expected failure, but the run succeeded with operations {:?}",
        run.context.operations_log()
    );
}

/// Asserts that `stage` recorded an error with the given recoverability.
pub fn assert_error_recorded(ctx: &Context, stage: &str, recoverable: bool) {
    assert!(
        ctx.errors()
            .iter()
            .any(|e| e.stage == stage && e.recoverable == recoverable),
        "Expected {} error for stage '{}', got {:?}",
        if recoverable { "a recoverable" } else { "a fatal" },
        stage,
        ctx.errors()
    );
}

/// Asserts that `stage` recorded an error of the given kind.
pub fn assert_error_kind(ctx: &Context, stage: &str, kind: ErrorKind) {
    assert!(
        ctx.errors().iter().any(|e| e.stage == stage && e.kind == kind),
        "Expected a {} error for stage '{}', got {:?}",
        kind,
        stage,
        ctx.errors()
    );
}

/// Asserts that no error was recorded.
pub fn assert_no_errors(ctx: &Context) {
    assert!(ctx.errors().is_empty(), "Expected no errors, got {:?}", ctx.errors());
}

/// Asserts that `value` is within `[0, 1]`.
pub fn assert_unit_range(name: &str, value: f64) {
    assert!(
        (0.0..=1.0).contains(&value),
        "Expected {name} in [0, 1], got {value}"
    );
}

/// Asserts that every numeric field of the profile is within `[0, 1]`.
pub fn assert_profile_in_range(profile: &DerivedProfile) {
    assert_unit_range("confidence_level", profile.confidence_level);
    assert_unit_range("adaptation_level", profile.adaptation_level);
    assert_unit_range("synthesis_confidence", profile.synthesis_confidence);
}
