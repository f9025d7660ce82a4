//! Build Pipeline - Single Entry Point
//!
//! CRITICAL: every build runs the validator. There is no path from a variant
//! record to a `BuiltPart` that skips it.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::builder::{envelope, FeatureBuilder, PartSpec};
use crate::hashing::{compute_job_hash, fingerprint};
use crate::nuts::{MetricNutTable, NutCatalog};
use crate::units::PatternCatalog;
use crate::validation::{CompletenessRule, FailureMode, ValidationResult, Validator};
use crate::variants::{VariantId, VariantRecord, VariantRegistry};
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    #[error("Configuration error in {family} variant '{variant}': {detail}")]
    Configuration {
        variant: VariantId,
        family: String,
        detail: String,
    },

    #[error("Variant '{variant}' references unknown {kind} '{name}'")]
    UnknownReference {
        variant: VariantId,
        kind: &'static str,
        name: String,
    },

    #[error("Variant '{variant}' is incomplete: {}", .markers.join(", "))]
    Incomplete {
        variant: VariantId,
        markers: Vec<String>,
    },

    #[error("Part number '{part_no}' is produced by several variants: {}", .variants.join(", "))]
    DuplicatePartNo {
        part_no: String,
        variants: Vec<VariantId>,
    },

    #[error("Variant {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BuildError {
    /// Stable machine-readable name, used in batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::VariantNotFound(_) => "variant_not_found",
            Self::Configuration { .. } => "configuration",
            Self::UnknownReference { .. } => "unknown_reference",
            Self::Incomplete { .. } => "incomplete",
            Self::DuplicatePartNo { .. } => "duplicate_part_no",
            Self::EngineVersionMismatch(..) => "engine_version_mismatch",
            Self::SerializationError(_) => "serialization",
        }
    }
}

/// A validated part ready for the modeling engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltPart {
    pub id: String,
    pub variant_id: VariantId,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    /// Hash of `part` alone; build id and timestamp do not enter it.
    pub fingerprint: String,
    pub job_hash: String,
    pub validation: ValidationResult,
    pub part: PartSpec,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub variant_id: VariantId,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub built: Vec<BuiltPart>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failure(&self, variant_id: &str) -> Option<&BatchFailure> {
        self.failed.iter().find(|f| f.variant_id == variant_id)
    }
}

/// The build pipeline - single entry point for all part operations
pub struct BuildPipeline {
    registry: VariantRegistry,
    patterns: PatternCatalog,
    nuts: Box<dyn NutCatalog>,
    validator: Validator,
}

impl BuildPipeline {
    pub fn new(registry: VariantRegistry) -> Self {
        Self {
            registry,
            patterns: PatternCatalog::builtin(),
            nuts: Box::new(MetricNutTable::new()),
            validator: Validator::new(),
        }
    }

    /// Replace the policy for incomplete markers.
    pub fn with_policy(mut self, incomplete: FailureMode) -> Self {
        self.validator = Validator::with_policy(incomplete);
        self
    }

    pub fn with_nut_catalog(mut self, nuts: Box<dyn NutCatalog>) -> Self {
        self.nuts = nuts;
        self
    }

    /// List all available variants
    pub fn list_variants(&self) -> Vec<&VariantRecord> {
        self.registry.list()
    }

    /// Get a specific variant
    pub fn get_variant(&self, id: &str) -> Option<&VariantRecord> {
        self.registry.get(id)
    }

    /// Build a registered variant's features and validate them.
    ///
    /// Builder errors surface as `Err`; rule violations land in the result.
    pub fn validate_variant(&self, id: &str) -> Result<ValidationResult, BuildError> {
        let record = self.lookup(id)?;
        self.validate_record(record)
    }

    pub fn validate_record(&self, record: &VariantRecord) -> Result<ValidationResult, BuildError> {
        let (_, validation) = self.prepare(record)?;
        Ok(validation)
    }

    pub fn build_variant(&self, id: &str) -> Result<BuiltPart, BuildError> {
        let record = self.lookup(id)?;
        self.build_record(record)
    }

    /// Build a part
    ///
    /// CRITICAL: This ALWAYS validates. A failed validation rejects the part.
    pub fn build_record(&self, record: &VariantRecord) -> Result<BuiltPart, BuildError> {
        let (part, validation) = self.prepare(record)?;

        if !validation.valid {
            return Err(rejection(record, &validation));
        }
        for violation in &validation.violations {
            tracing::warn!(variant = %record.id, rule = %violation.rule, "{}", violation.describe());
        }

        let fingerprint = fingerprint(&part)?;
        let job_hash = compute_job_hash(&record.id, record, ENGINE_VERSION)?;
        tracing::info!(variant = %record.id, part_no = %part.part_no, %fingerprint, "built part");

        Ok(BuiltPart {
            id: Uuid::new_v4().to_string(),
            variant_id: record.id.clone(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            fingerprint,
            job_hash,
            validation,
            part,
        })
    }

    /// Build every registered variant.
    pub fn build_all(&self) -> BatchReport {
        let ids: Vec<VariantId> = self.registry.list().iter().map(|r| r.id.clone()).collect();
        self.build_batch(&ids)
    }

    /// Build each variant independently; one failure never stops the rest.
    ///
    /// Part numbers are derived from the records before anything is built, so
    /// variants that share one all fail with `DuplicatePartNo` whatever else
    /// would have happened to them.
    pub fn build_batch(&self, ids: &[VariantId]) -> BatchReport {
        let mut seen = BTreeSet::new();
        let mut requested: Vec<&VariantId> = vec![];
        for id in ids {
            if seen.insert(id.as_str()) {
                requested.push(id);
            }
        }

        let part_nos: BTreeMap<&str, String> = requested
            .iter()
            .copied()
            .filter_map(|id| {
                self.registry
                    .get(id)
                    .map(|record| (id.as_str(), envelope(&record.family).0))
            })
            .collect();
        let mut owners: BTreeMap<&str, Vec<VariantId>> = BTreeMap::new();
        for &id in &requested {
            if let Some(part_no) = part_nos.get(id.as_str()) {
                owners.entry(part_no.as_str()).or_default().push(id.clone());
            }
        }

        let mut built = vec![];
        let mut failures = vec![];
        for id in requested {
            let clash = part_nos
                .get(id.as_str())
                .filter(|part_no| owners[part_no.as_str()].len() > 1);
            if let Some(part_no) = clash {
                let error = BuildError::DuplicatePartNo {
                    part_no: part_no.clone(),
                    variants: owners[part_no.as_str()].clone(),
                };
                failures.push((id.clone(), error));
                continue;
            }
            match self.build_variant(id) {
                Ok(part) => built.push(part),
                Err(e) => failures.push((id.clone(), e)),
            }
        }

        let failed = failures
            .into_iter()
            .map(|(variant_id, error)| {
                tracing::warn!(variant = %variant_id, kind = error.kind(), "part failed: {}", error);
                BatchFailure {
                    variant_id,
                    kind: error.kind(),
                    message: error.to_string(),
                }
            })
            .collect();

        BatchReport { built, failed }
    }

    fn lookup(&self, id: &str) -> Result<&VariantRecord, BuildError> {
        self.registry
            .get(id)
            .ok_or_else(|| BuildError::VariantNotFound(id.to_string()))
    }

    fn prepare(&self, record: &VariantRecord) -> Result<(PartSpec, ValidationResult), BuildError> {
        self.check_engine_version(record)?;

        let part = FeatureBuilder::new(&self.patterns, self.nuts.as_ref()).build(record)?;

        // MANDATORY: Validation is always called. This is non-negotiable.
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);
        let validation = self.validator.validate(&part, record);

        Ok((part, validation))
    }

    fn check_engine_version(&self, record: &VariantRecord) -> Result<(), BuildError> {
        let engine_ver = semver::Version::parse(ENGINE_VERSION).map_err(|e| {
            configuration(record, format!("invalid engine version {}: {}", ENGINE_VERSION, e))
        })?;
        let min_ver = semver::Version::parse(&record.engine_min_version).map_err(|e| {
            configuration(
                record,
                format!("invalid engineMinVersion {}: {}", record.engine_min_version, e),
            )
        })?;

        if engine_ver < min_ver {
            return Err(BuildError::EngineVersionMismatch(
                record.id.clone(),
                record.engine_min_version.clone(),
                ENGINE_VERSION.to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for BuildPipeline {
    fn default() -> Self {
        Self::new(VariantRegistry::builtin())
    }
}

fn configuration(record: &VariantRecord, detail: String) -> BuildError {
    BuildError::Configuration {
        variant: record.id.clone(),
        family: record.family.name().to_string(),
        detail,
    }
}

/// Geometry errors outrank incomplete markers.
fn rejection(record: &VariantRecord, validation: &ValidationResult) -> BuildError {
    let geometry: Vec<_> = validation
        .errors()
        .filter(|v| v.rule != CompletenessRule::NAME)
        .map(|v| v.describe())
        .collect();
    if !geometry.is_empty() {
        return configuration(record, geometry.join("; "));
    }
    BuildError::Incomplete {
        variant: record.id.clone(),
        markers: record.incomplete.iter().map(|m| m.feature.clone()).collect(),
    }
}
