//! Validation System - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Policy maps violations to actions.

use serde::{Deserialize, Serialize};

use crate::builder::PartSpec;
use crate::features::Face;
use crate::variants::VariantRecord;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

/// What to do with a variant that carries incomplete markers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    #[default]
    Block,
    Warn,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub face: Option<Face>,
    pub feature: Option<usize>,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

impl ValidationViolation {
    /// `face[index] message (got actual)`, for error reports.
    pub fn describe(&self) -> String {
        let location = match (self.face, self.feature) {
            (Some(face), Some(idx)) => format!("{}[{}] ", face, idx),
            (Some(face), None) => format!("{} ", face),
            _ => String::new(),
        };
        match &self.actual {
            Some(actual) => format!("{}{} (got {})", location, self.message, actual),
            None => format!("{}{}", location, self.message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
    pub variant_id: String,
    pub part_no: String,
}

impl ValidationResult {
    pub fn success(part: &PartSpec) -> Self {
        Self {
            valid: true,
            violations: vec![],
            variant_id: part.variant.clone(),
            part_no: part.part_no.clone(),
        }
    }

    pub fn failure(part: &PartSpec, violations: Vec<ValidationViolation>) -> Self {
        Self {
            valid: false,
            violations,
            variant_id: part.variant.clone(),
            part_no: part.part_no.clone(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == ViolationSeverity::Error)
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, part: &PartSpec, record: &VariantRecord) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

/// Every feature anchor lies on its face: `0 <= u <= width`, `0 <= v <= height`.
pub struct FaceExtentRule;

impl ValidationRule for FaceExtentRule {
    fn name(&self) -> &'static str { "face_extent" }

    fn validate(&self, part: &PartSpec, _record: &VariantRecord) -> Vec<ValidationViolation> {
        part.faces
            .iter()
            .filter_map(|(face, idx, feature)| {
                let extent = part.extent(face);
                let pos = feature.pos();
                if extent.contains(pos) {
                    return None;
                }
                Some(ValidationViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Error,
                    message: format!("{} outside face", feature.kind()),
                    face: Some(face),
                    feature: Some(idx),
                    expected: Some(format!("within (0, 0)..({}, {})", extent.u, extent.v)),
                    actual: Some(pos.to_string()),
                    remediation: vec!["Check the offsets feeding this feature".to_string()],
                })
            })
            .collect()
    }
}

/// Diameters, lengths, widths and blind depths must be positive.
pub struct PositiveDimensionRule;

impl ValidationRule for PositiveDimensionRule {
    fn name(&self) -> &'static str { "positive_dimension" }

    fn validate(&self, part: &PartSpec, _record: &VariantRecord) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for (face, idx, feature) in part.faces.iter() {
            for (dimension, value) in feature.dimensions() {
                if value > 0.0 {
                    continue;
                }
                violations.push(ValidationViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Error,
                    message: format!("{} {} not positive at {}", feature.kind(), dimension, feature.pos()),
                    face: Some(face),
                    feature: Some(idx),
                    expected: Some("> 0".to_string()),
                    actual: Some(format!("{:.3}", value)),
                    remediation: vec!["Enlarge the part or reduce the margins".to_string()],
                });
            }
        }
        violations
    }
}

/// Surfaces geometry the record declares as missing.
pub struct CompletenessRule;

impl CompletenessRule {
    pub const NAME: &'static str = "completeness";
}

impl ValidationRule for CompletenessRule {
    fn name(&self) -> &'static str { Self::NAME }

    fn validate(&self, _part: &PartSpec, record: &VariantRecord) -> Vec<ValidationViolation> {
        record
            .incomplete
            .iter()
            .map(|marker| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: format!("{} is incomplete", marker.feature),
                face: marker.face,
                feature: None,
                expected: None,
                actual: (!marker.note.is_empty()).then(|| marker.note.clone()),
                remediation: vec!["Measure the physical part and complete the record".to_string()],
            })
            .collect()
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
    incomplete: FailureMode,
}

impl Validator {
    pub fn new() -> Self {
        Self::with_policy(FailureMode::Block)
    }

    pub fn with_policy(incomplete: FailureMode) -> Self {
        Self {
            rules: vec![
                Box::new(FaceExtentRule),
                Box::new(PositiveDimensionRule),
                Box::new(CompletenessRule),
            ],
            incomplete,
        }
    }

    pub fn policy(&self) -> FailureMode {
        self.incomplete
    }

    pub fn validate(&self, part: &PartSpec, record: &VariantRecord) -> ValidationResult {
        let mut all_violations = vec![];

        for rule in &self.rules {
            let violations = rule.validate(part, record);
            all_violations.extend(violations);
        }

        // Geometry errors always block; only completeness follows the policy.
        let downgrade = match self.incomplete {
            FailureMode::Block => None,
            FailureMode::Warn => Some(ViolationSeverity::Warning),
            FailureMode::Log => Some(ViolationSeverity::Info),
        };
        if let Some(severity) = downgrade {
            for violation in all_violations.iter_mut() {
                if violation.rule == CompletenessRule::NAME {
                    violation.severity = severity.clone();
                }
            }
        }

        let has_errors = all_violations.iter()
            .any(|v| v.severity == ViolationSeverity::Error);

        if has_errors {
            ValidationResult::failure(part, all_violations)
        } else {
            ValidationResult {
                valid: true,
                violations: all_violations,
                variant_id: part.variant.clone(),
                part_no: part.part_no.clone(),
            }
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
