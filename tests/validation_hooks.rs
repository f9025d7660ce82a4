//! Proves every build path runs the validator.
//!
//! Kept in its own test binary so the global counter is not shared with
//! tests running in parallel.

#![cfg(feature = "test-hooks")]

use caseparts_core::pipeline::{get_validation_call_count, reset_validation_call_count};
use caseparts_core::{BuildPipeline, FailureMode, VariantId};

#[test]
fn invariant_build_calls_validate() {
    let pipeline = BuildPipeline::default();
    reset_validation_call_count();

    pipeline.build_variant("mini-itx").unwrap();
    assert_eq!(get_validation_call_count(), 1);

    // Rejected builds still validated before they were rejected.
    assert!(pipeline.build_variant("psu-atx-generic").is_err());
    assert_eq!(get_validation_call_count(), 2);

    pipeline.validate_variant("conn-cube").unwrap();
    assert_eq!(get_validation_call_count(), 3);

    // Unknown ids never reach the builder.
    assert!(pipeline.build_variant("nonexistent").is_err());
    assert_eq!(get_validation_call_count(), 3);

    let ids: Vec<VariantId> = vec!["fan-40x40x10".into(), "fan-120x120x25".into()];
    let report = BuildPipeline::default()
        .with_policy(FailureMode::Log)
        .build_batch(&ids);
    assert!(report.is_success());
    assert_eq!(get_validation_call_count(), 5);
}
