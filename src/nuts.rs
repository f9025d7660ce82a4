//! Nut Specifications
//!
//! Nut dimensions come from outside the builder; the builder only asks for
//! them by name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutSpec {
    pub thickness: f64,
    pub side_to_side: f64,
}

/// Lookup seam for nut dimensions.
pub trait NutCatalog {
    fn lookup(&self, nut_type: &str) -> Option<NutSpec>;
}

/// ISO 4032 hex nuts, nominal sizes.
#[derive(Debug, Clone)]
pub struct MetricNutTable {
    nuts: HashMap<String, NutSpec>,
}

impl MetricNutTable {
    pub fn new() -> Self {
        let nuts = [
            ("M2", 1.6, 4.0),
            ("M2.5", 2.0, 5.0),
            ("M3", 2.4, 5.5),
            ("M4", 3.2, 7.0),
            ("M5", 4.7, 8.0),
            ("M6", 5.2, 10.0),
            ("M8", 6.8, 13.0),
        ]
        .into_iter()
        .map(|(name, thickness, side_to_side)| {
            (name.to_string(), NutSpec { thickness, side_to_side })
        })
        .collect();
        Self { nuts }
    }
}

impl Default for MetricNutTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NutCatalog for MetricNutTable {
    fn lookup(&self, nut_type: &str) -> Option<NutSpec> {
        self.nuts.get(nut_type).copied()
    }
}
