//! Contract Invariant Tests
//!
//! These tests verify the guarantees the modeling engine relies on.

use std::fs;

use caseparts_core::{
    BuildError, BuildPipeline, Face, FailureMode, FeatureRequest, FormFactor, Family,
    VariantId, VariantRecord, VariantRegistry,
    hashing::canonical_json,
    variants::MotherboardParams,
};

fn board(id: &str, params: MotherboardParams) -> VariantRecord {
    VariantRecord::new(id, id, Family::Motherboard(params))
}

fn bays(part: &caseparts_core::BuiltPart) -> Vec<f64> {
    part.part.faces[Face::Front]
        .iter()
        .filter(|f| f.is_external())
        .map(|f| f.pos().u)
        .collect()
}

#[test]
fn invariant_same_record_same_part() {
    let pipeline = BuildPipeline::default();

    let first = pipeline.build_variant("standard-atx-2full").unwrap();
    let second = pipeline.build_variant("standard-atx-2full").unwrap();

    // Build id and timestamp differ; nothing else may.
    assert_ne!(first.id, second.id);
    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(first.job_hash, second.job_hash);
    assert_eq!(
        canonical_json(&first.part).unwrap(),
        canonical_json(&second.part).unwrap()
    );
}

#[test]
fn invariant_different_records_differ() {
    let pipeline = BuildPipeline::default();
    let plain = pipeline.build_variant("micro-atx").unwrap();
    let with_card = pipeline.build_variant("micro-atx-1half").unwrap();
    assert_ne!(plain.fingerprint, with_card.fingerprint);
}

#[test]
fn invariant_half_height_card_board() {
    let params = MotherboardParams {
        standoff: 8.0,
        pcie_cards: 1,
        pcie_full_height: false,
        ..MotherboardParams::new(FormFactor::MicroAtx)
    };
    let part = BuildPipeline::default()
        .build_record(&board("micro-1half", params))
        .unwrap();

    assert_eq!(part.part.z_size, 53.0);
    assert!(part.part.part_no.ends_with("-1half"), "{}", part.part.part_no);
    assert_eq!(bays(&part), vec![167.0]);
}

#[test]
fn invariant_full_height_cards_board() {
    let params = MotherboardParams {
        pcie_cards: 2,
        pcie_full_height: true,
        ..MotherboardParams::new(FormFactor::StandardAtx)
    };
    let part = BuildPipeline::default()
        .build_record(&board("atx-2full", params))
        .unwrap();

    assert!(part.part.part_no.ends_with("-2full"), "{}", part.part.part_no);
    let positions = bays(&part);
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0], 167.0);
    assert!((positions[1] - 187.32).abs() < 1e-9);
}

#[test]
fn invariant_every_hole_has_a_mirrored_partner() {
    let part = BuildPipeline::default().build_variant("mini-itx").unwrap().part;
    let top = &part.faces[Face::Top];
    let bottom = &part.faces[Face::Bottom];
    assert!(!top.is_empty());
    assert_eq!(top.len(), bottom.len());
    for (upper, lower) in top.iter().zip(bottom) {
        assert!((lower.pos().v - (part.y_size - upper.pos().v)).abs() < 1e-9);
    }
}

#[test]
fn invariant_features_stay_on_their_face() {
    let report = BuildPipeline::default().with_policy(FailureMode::Warn).build_all();
    assert!(report.is_success(), "{:?}", report.failed);
    for built in &report.built {
        let part = &built.part;
        for (face, idx, feature) in part.faces.iter() {
            assert!(
                part.extent(face).contains(feature.pos()),
                "{} {}[{}] at {}",
                part.part_no,
                face,
                idx,
                feature.pos()
            );
        }
    }
}

#[test]
fn invariant_oversized_card_count_is_rejected() {
    let params = MotherboardParams {
        pcie_cards: 5,
        ..MotherboardParams::new(FormFactor::MicroAtx)
    };
    let err = BuildPipeline::default()
        .build_record(&board("crowded", params))
        .unwrap_err();
    assert!(matches!(err, BuildError::Configuration { .. }), "{}", err);
    assert!(err.to_string().contains("crowded"));
}

#[test]
fn invariant_incomplete_variants_are_flagged() {
    let blocking = BuildPipeline::default().build_all();
    let flagged: Vec<_> = blocking
        .failed
        .iter()
        .filter(|f| f.kind == "incomplete")
        .map(|f| f.variant_id.as_str())
        .collect();
    assert_eq!(
        flagged,
        ["mini-itx-lp-pcie", "psu-atx-generic", "psu-flexatx-silverstonetek"]
    );
    assert_eq!(blocking.failed.len(), flagged.len());

    let warning = BuildPipeline::default().with_policy(FailureMode::Warn);
    let part = warning.build_variant("psu-flexatx-silverstonetek").unwrap();
    assert!(part.validation.valid);
    assert_eq!(part.validation.violations.len(), 6);
}

#[test]
fn invariant_batch_failures_are_independent() {
    let mut registry = VariantRegistry::builtin();
    let mut clone = registry.get("fan-80x80x25").unwrap().clone();
    clone.id = "fan-80-copy".to_string();
    registry.register(clone);
    let pipeline = BuildPipeline::new(registry);

    let ids: Vec<VariantId> = ["fan-80x80x25", "missing-variant", "fan-80-copy", "mini-itx"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let report = pipeline.build_batch(&ids);

    assert_eq!(report.built.len(), 1);
    assert_eq!(report.built[0].variant_id, "mini-itx");
    assert_eq!(report.failure("missing-variant").unwrap().kind, "variant_not_found");
    assert_eq!(report.failure("fan-80x80x25").unwrap().kind, "duplicate_part_no");
    assert_eq!(report.failure("fan-80-copy").unwrap().kind, "duplicate_part_no");
}

#[test]
fn invariant_duplicates_do_not_depend_on_sibling_outcome() {
    let mut registry = VariantRegistry::builtin();
    let mut twin = registry.get("conn-cube").unwrap().clone();
    twin.id = "conn-cube-unmeasured".to_string();
    twin.incomplete.push(caseparts_core::variants::IncompleteMarker {
        face: None,
        feature: "nut-channel".to_string(),
        note: String::new(),
    });
    registry.register(twin);
    let pipeline = BuildPipeline::new(registry);

    let ids: Vec<VariantId> = ["conn-cube", "conn-cube-unmeasured", "fan-40x40x10"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let report = pipeline.build_batch(&ids);

    assert_eq!(report.built.len(), 1);
    assert_eq!(report.built[0].variant_id, "fan-40x40x10");
    assert_eq!(report.failure("conn-cube").unwrap().kind, "duplicate_part_no");
    assert_eq!(report.failure("conn-cube-unmeasured").unwrap().kind, "duplicate_part_no");
}

#[test]
fn invariant_variant_not_found_error() {
    let result = BuildPipeline::default().validate_variant("nonexistent");
    assert!(result.unwrap_err().to_string().contains("Variant not found"));
}

#[test]
fn invariant_validation_result_structure() {
    let result = BuildPipeline::default().validate_variant("psu-atx-generic").unwrap();

    assert!(!result.valid);
    assert_eq!(result.variant_id, "psu-atx-generic");
    assert!(!result.violations.is_empty());
    for v in &result.violations {
        assert!(!v.rule.is_empty());
        assert!(!v.message.is_empty());
        assert!(!v.remediation.is_empty());
    }
}

#[test]
fn invariant_variant_directory_overrides_builtins() {
    let dir = tempfile::tempdir().unwrap();

    let mut cube = VariantRegistry::builtin().get("conn-cube").unwrap().clone();
    cube.name = "Connector cube (M4)".to_string();
    if let Family::ConnectorCube(params) = &mut cube.family {
        params.nut_type = "M4".to_string();
    }
    fs::write(dir.path().join("conn-cube.json"), serde_json::to_string(&cube).unwrap()).unwrap();
    fs::write(
        dir.path().join("fan-60.json"),
        r#"{"id": "fan-60x60x15", "name": "60mm fan",
            "family": {"kind": "fan", "size": 60.0, "thickness": 15.0}}"#,
    )
    .unwrap();
    fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let mut registry = VariantRegistry::builtin();
    let before = registry.list().len();
    let loaded = registry.extend_from_dir(dir.path()).unwrap();
    assert_eq!(loaded, 2);
    assert_eq!(registry.list().len(), before + 1);
    assert_eq!(registry.get("conn-cube").unwrap().name, "Connector cube (M4)");

    let pipeline = BuildPipeline::new(registry);
    let fan = pipeline.build_variant("fan-60x60x15").unwrap();
    assert_eq!(fan.part.part_no, "fan_60x60x15");

    let cube = pipeline.build_variant("conn-cube").unwrap();
    let has_m4 = cube.part.faces[Face::Front].iter().any(|f| {
        matches!(f, FeatureRequest::NutRecess { nut_type, .. } if nut_type == "M4")
    });
    assert!(has_m4);
}

#[test]
fn invariant_missing_variant_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let registry = VariantRegistry::load_from_dir(&dir.path().join("absent")).unwrap();
    assert!(registry.list().is_empty());
}
