//! Unit & Coordinate Conversion
//!
//! Hole patterns are authored in the unit and origin of their reference
//! drawing. Resolving a pattern maps every entry into part-local millimeters:
//! `mm = reference * unit_factor + origin_offset`, per axis.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::features::Pos2;

pub const MM_PER_INCH: f64 = 25.4;

/// Per-pattern conversion constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub unit_factor: f64,
    pub origin_offset: Pos2,
}

impl Conversion {
    pub const fn millimeters() -> Self {
        Self {
            unit_factor: 1.0,
            origin_offset: Pos2::new(0.0, 0.0),
        }
    }

    pub const fn inches(origin_offset: Pos2) -> Self {
        Self {
            unit_factor: MM_PER_INCH,
            origin_offset,
        }
    }

    pub fn apply(&self, reference: Pos2) -> Pos2 {
        Pos2::new(
            reference.u * self.unit_factor + self.origin_offset.u,
            reference.v * self.unit_factor + self.origin_offset.v,
        )
    }

    /// Same unit, origin moved by an extra millimeter offset.
    pub fn shifted(&self, shift: Pos2) -> Self {
        Self {
            unit_factor: self.unit_factor,
            origin_offset: Pos2::new(self.origin_offset.u + shift.u, self.origin_offset.v + shift.v),
        }
    }
}

/// A named mapping from hole identifier to reference-unit position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountingHolePattern {
    pub name: String,
    pub conversion: Conversion,
    pub holes: BTreeMap<String, Pos2>,
}

impl MountingHolePattern {
    pub fn new(name: impl Into<String>, conversion: Conversion) -> Self {
        Self {
            name: name.into(),
            conversion,
            holes: BTreeMap::new(),
        }
    }

    pub fn with_hole(mut self, id: impl Into<String>, u: f64, v: f64) -> Self {
        self.holes.insert(id.into(), Pos2::new(u, v));
        self
    }

    /// Every hole in part-local millimeters, keyed by identifier.
    pub fn resolve(&self) -> BTreeMap<String, Pos2> {
        self.resolve_with(&self.conversion)
    }

    /// Resolve with the pattern origin moved by `shift` millimeters.
    pub fn resolve_shifted(&self, shift: Pos2) -> BTreeMap<String, Pos2> {
        self.resolve_with(&self.conversion.shifted(shift))
    }

    fn resolve_with(&self, conversion: &Conversion) -> BTreeMap<String, Pos2> {
        self.holes
            .iter()
            .map(|(id, pos)| (id.clone(), conversion.apply(*pos)))
            .collect()
    }
}

/// ATX mounting holes as seen from the component side, in inches.
///
/// Front is the connector edge; the PCIe slots run along it on the right.
pub fn atx_pattern() -> MountingHolePattern {
    MountingHolePattern::new("atx", Conversion::inches(Pos2::new(3.8, 3.3)))
        .with_hole("A", 11.35, 0.4)
        .with_hole("B", 8.25, 0.4)
        .with_hole("C", 6.45, 0.4)
        .with_hole("F", 0.25, 1.3)
        .with_hole("G", 11.35, 6.5)
        .with_hole("H", 6.45, 6.5)
        .with_hole("J", 0.25, 6.5)
        .with_hole("K", 11.35, 9.35)
        .with_hole("L", 6.45, 9.35)
        .with_hole("M", 0.25, 9.35)
        .with_hole("R", 9.05, 6.5)
        .with_hole("S", 8.25, 6.5)
}

/// Mini-ITX holes measured on a 170 mm square PCB, back is the connector edge.
pub fn mini_itx_pattern() -> MountingHolePattern {
    const PCB: f64 = 170.0;
    const LEFT_RIGHT: f64 = 157.48;
    const LEFT_FRONT_BACK: f64 = 154.94;
    const RIGHT_FRONT_BACK: f64 = 132.08;
    const LEFT_EDGE: f64 = 6.35;
    // Drawing dimensions the front row from the back edge.
    const FRONT_EDGE: f64 = PCB - LEFT_FRONT_BACK - 10.16;

    MountingHolePattern::new("mini-itx", Conversion::millimeters())
        .with_hole("front-left", LEFT_EDGE, FRONT_EDGE)
        .with_hole("back-left", LEFT_EDGE, FRONT_EDGE + LEFT_FRONT_BACK)
        .with_hole("front-right", LEFT_EDGE + LEFT_RIGHT, FRONT_EDGE)
        .with_hole("back-right", LEFT_EDGE + LEFT_RIGHT, FRONT_EDGE + RIGHT_FRONT_BACK)
}

/// Hole patterns addressable by name.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    patterns: HashMap<String, MountingHolePattern>,
}

impl PatternCatalog {
    pub fn new() -> Self {
        Self {
            patterns: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(atx_pattern());
        catalog.register(mini_itx_pattern());
        catalog
    }

    pub fn get(&self, name: &str) -> Option<&MountingHolePattern> {
        self.patterns.get(name)
    }

    pub fn register(&mut self, pattern: MountingHolePattern) {
        self.patterns.insert(pattern.name.clone(), pattern);
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
