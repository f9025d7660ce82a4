//! Case Parts Core - parametric feature generation for computer-case parts
//!
//! # Ground Rules
//! 1. Features Live On Faces
//! 2. Variants Are Records, Not Subclasses
//! 3. Every Build Validates
//! 4. Same Record, Same Fingerprint
//! 5. Missing Geometry Is Declared, Never Guessed

pub mod features;
pub mod units;
pub mod bounds;
pub mod vents;
pub mod nuts;
pub mod material;
pub mod variants;
pub mod builder;
pub mod validation;
pub mod hashing;
pub mod pipeline;

pub use features::{Depth, Extent, Face, FaceMap, FeatureRequest, Pos2};
pub use variants::{Family, FormFactor, VariantId, VariantRecord, VariantRegistry};
pub use builder::{FeatureBuilder, PartSpec};
pub use validation::{FailureMode, ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use hashing::{canonical_json, compute_job_hash, fingerprint};
pub use pipeline::{BatchReport, BuildError, BuildPipeline, BuiltPart};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
