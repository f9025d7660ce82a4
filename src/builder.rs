//! Oriented-Face Feature Builder
//!
//! Turns a variant record into a [`PartSpec`]: the part envelope plus an
//! ordered feature list per face. Each family has one policy; everything a
//! policy varies on comes from the record.

use serde::Serialize;
use thiserror::Error;

use crate::bounds;
use crate::features::{Depth, Extent, Face, FaceMap, FeatureRequest, Pos2};
use crate::material::{Colour, Fabrication};
use crate::nuts::NutCatalog;
use crate::pipeline::BuildError;
use crate::units::{PatternCatalog, MM_PER_INCH};
use crate::variants::{
    ConnectorCubeParams, Family, FanParams, MotherboardParams, PowerSupplyParams, VariantId,
    VariantRecord,
};
use crate::vents::SlotArraySpec;

/// Largest accepted envelope edge, in mm. Nothing in a desktop case comes close.
pub const MAX_PART_EXTENT: f64 = 1000.0;

// Motherboards

/// Marks that identify the connector edge.
pub const CONNECTOR_MARKS: [Pos2; 3] = [
    Pos2::new(20.0, 20.0),
    Pos2::new(40.0, 20.0),
    Pos2::new(60.0, 20.0),
];
const MARK_DIAMETER: f64 = 10.0;
const MARK_DEPTH: f64 = 5.0;

/// Width of the rear I/O connector area on the front edge.
pub const CONNECTOR_AREA: f64 = 6.5 * MM_PER_INCH;
const FRONT_TRIM_DEPTH: f64 = 3.3;
const LEFT_TRIM_DEPTH: f64 = 3.8;
const LEFT_TRIM_LIP: f64 = 3.3;

pub const PCIE_BAY_OFFSET: f64 = 167.0;
pub const PCIE_BAY_PITCH: f64 = 20.32;
pub const PCIE_BAY_WIDTH: f64 = 12.7;
pub const PCIE_FULL_HEIGHT: f64 = 111.15;
pub const PCIE_LOW_PROFILE_HEIGHT: f64 = 68.9;

// Connector cube
const CUBE_BOLT_INSET: f64 = 4.0;
const CUBE_CLEARANCE: f64 = 3.2;
const CUBE_FIT: f64 = 3.0;
const CUBE_FIT_DEPTH: f64 = 3.0;
const CUBE_TAP: f64 = 2.9;
const CUBE_NUT_SINK: f64 = 1.0;
const CUBE_CHANNEL_INSET: f64 = 1.0;
const CUBE_CHANNEL_DEPTH: f64 = 5.0;
const CUBE_TRIM_LONG: f64 = 6.0;
const CUBE_TRIM_SHORT: f64 = 4.0;
const CUBE_ROUND: f64 = 4.0;

// Fans
const FAN_BORDER: f64 = 1.0;
const FAN_HUB_DEPTH: f64 = 2.0;
const FAN_SCREW_HOLE: f64 = 4.5;
const FAN_SLOT_WIDTH: f64 = 5.0;
const FAN_WALL_WIDTH: f64 = 4.0;

/// A part instance with its resolved per-face features.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartSpec {
    pub part_no: String,
    pub variant: VariantId,
    pub family: String,
    pub x_size: f64,
    pub y_size: f64,
    pub z_size: f64,
    pub colour: Colour,
    pub fabrication: Fabrication,
    pub faces: FaceMap,
}

impl PartSpec {
    pub fn extent(&self, face: Face) -> Extent {
        face.extent(self.x_size, self.y_size, self.z_size)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("clearance diameter {clearance} must exceed fit diameter {fit}")]
pub struct HolePairError {
    pub clearance: f64,
    pub fit: f64,
}

/// Diameters for a hole that passes through one part into the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HolePair {
    pub clearance: f64,
    pub fit: f64,
}

impl HolePair {
    pub fn new(clearance: f64, fit: f64) -> Result<Self, HolePairError> {
        if clearance > fit && fit > 0.0 {
            Ok(Self { clearance, fit })
        } else {
            Err(HolePairError { clearance, fit })
        }
    }
}

pub struct FeatureBuilder<'a> {
    patterns: &'a PatternCatalog,
    nuts: &'a dyn NutCatalog,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(patterns: &'a PatternCatalog, nuts: &'a dyn NutCatalog) -> Self {
        Self { patterns, nuts }
    }

    pub fn build(&self, record: &VariantRecord) -> Result<PartSpec, BuildError> {
        let (part_no, [x_size, y_size, z_size]) = envelope(&record.family);
        // Also rejects NaN and infinity.
        let in_range = |size: f64| size > 0.0 && size <= MAX_PART_EXTENT;
        if !(in_range(x_size) && in_range(y_size) && in_range(z_size)) {
            return Err(configuration(
                record,
                format!(
                    "envelope {} x {} x {} must be positive and at most {} mm",
                    x_size, y_size, z_size, MAX_PART_EXTENT
                ),
            ));
        }

        let mut faces = FaceMap::new();
        let size = [x_size, y_size, z_size];
        match &record.family {
            Family::Motherboard(params) => self.motherboard(record, params, size, &mut faces)?,
            Family::PowerSupply(params) => power_supply(params, &mut faces),
            Family::ConnectorCube(params) => self.connector_cube(record, params, &mut faces)?,
            Family::Fan(params) => fan(record, params, &mut faces)?,
        }
        tracing::debug!(
            variant = %record.id,
            part_no = %part_no,
            features = faces.len(),
            "built feature lists"
        );

        Ok(PartSpec {
            part_no,
            variant: record.id.clone(),
            family: record.family.name().to_string(),
            x_size,
            y_size,
            z_size,
            colour: record.colour,
            fabrication: record.fabrication,
            faces,
        })
    }

    fn motherboard(
        &self,
        record: &VariantRecord,
        params: &MotherboardParams,
        [x_size, y_size, z_size]: [f64; 3],
        faces: &mut FaceMap,
    ) -> Result<(), BuildError> {
        let profile = params.form_factor.profile();
        let pattern = self
            .patterns
            .get(profile.pattern)
            .ok_or_else(|| unknown(record, "hole pattern", profile.pattern))?;
        let pair = HolePair::new(params.clearance_diameter, params.fit_diameter)
            .map_err(|e| configuration(record, e.to_string()))?;

        let candidates = pattern.resolve_shifted(profile.pattern_shift);
        let accepted = bounds::within(&candidates, Extent::new(x_size, y_size));
        tracing::debug!(
            variant = %record.id,
            pattern = profile.pattern,
            accepted = accepted.len(),
            candidates = candidates.len(),
            "filtered mounting holes"
        );
        for pos in accepted.values() {
            faces.push(Face::Top, FeatureRequest::hole(*pos, pair.clearance, Depth::Through));
            let mirrored = Pos2::new(pos.u, y_size - pos.v);
            faces.push(
                Face::Bottom,
                FeatureRequest::hole(mirrored, pair.fit, Depth::Through).external(),
            );
        }

        let mark_extent = profile.mark_face.extent(x_size, y_size, z_size);
        for pos in bounds::retain(&CONNECTOR_MARKS, mark_extent) {
            faces.push(
                profile.mark_face,
                FeatureRequest::hole(pos, MARK_DIAMETER, Depth::Blind(MARK_DEPTH)),
            );
        }

        if profile.edge_trim {
            faces.push(
                Face::Front,
                FeatureRequest::cut_box(
                    Pos2::new(CONNECTOR_AREA, 0.0),
                    x_size,
                    z_size,
                    Depth::Blind(FRONT_TRIM_DEPTH),
                ),
            );
            faces.push(
                Face::Left,
                FeatureRequest::cut_box(
                    Pos2::new(0.0, 0.0),
                    y_size - LEFT_TRIM_LIP,
                    z_size,
                    Depth::Blind(LEFT_TRIM_DEPTH),
                ),
            );
        }

        let bay_height = if params.pcie_full_height {
            PCIE_FULL_HEIGHT
        } else {
            PCIE_LOW_PROFILE_HEIGHT
        };
        if params.pcie_cards > 0 {
            let last = PCIE_BAY_OFFSET + f64::from(params.pcie_cards - 1) * PCIE_BAY_PITCH;
            if last > x_size {
                return Err(configuration(
                    record,
                    format!(
                        "{} PCIe bays: last bay at u = {:.3} is past the {} face width {}",
                        params.pcie_cards,
                        last,
                        Face::Front,
                        x_size
                    ),
                ));
            }
        }
        for n in 0..params.pcie_cards {
            let pos = Pos2::new(PCIE_BAY_OFFSET + f64::from(n) * PCIE_BAY_PITCH, 0.0);
            faces.push(
                Face::Front,
                FeatureRequest::cut_box(pos, PCIE_BAY_WIDTH, bay_height, Depth::Through).external(),
            );
        }
        Ok(())
    }

    fn connector_cube(
        &self,
        record: &VariantRecord,
        params: &ConnectorCubeParams,
        faces: &mut FaceMap,
    ) -> Result<(), BuildError> {
        let nut = self
            .nuts
            .lookup(&params.nut_type)
            .ok_or_else(|| unknown(record, "nut type", &params.nut_type))?;
        let size = params.size;
        let near = CUBE_BOLT_INSET;
        let far = size - CUBE_BOLT_INSET;

        // Bolt axes; the flag picks the far coordinate.
        for (face, far_u, far_v) in [
            (Face::Front, false, true),
            (Face::Bottom, false, false),
            (Face::Right, true, true),
        ] {
            let pos = Pos2::new(
                if far_u { far } else { near },
                if far_v { far } else { near },
            );
            faces.push(face, FeatureRequest::hole(pos, CUBE_CLEARANCE, Depth::Through).external());
            faces.push(face, FeatureRequest::hole(pos, CUBE_FIT, Depth::Blind(CUBE_FIT_DEPTH)));
            faces.push(face, FeatureRequest::hole(pos, CUBE_TAP, Depth::Through));
            faces.push(face, FeatureRequest::nut(pos, &params.nut_type, CUBE_NUT_SINK, far_u));
        }

        // Channels the nuts slide in through.
        let half_nut = nut.side_to_side / 2.0;
        let channel = Depth::Blind(CUBE_CHANNEL_DEPTH);
        faces.push(
            Face::Top,
            FeatureRequest::cut_box(
                Pos2::new(size - far - half_nut, CUBE_CHANNEL_INSET),
                nut.side_to_side,
                nut.thickness,
                channel,
            ),
        );
        faces.push(
            Face::Top,
            FeatureRequest::cut_box(
                Pos2::new(size - CUBE_CHANNEL_INSET - nut.thickness, far - half_nut),
                nut.thickness,
                nut.side_to_side,
                channel,
            ),
        );
        faces.push(
            Face::Back,
            FeatureRequest::cut_box(
                Pos2::new(far - half_nut, CUBE_CHANNEL_INSET),
                nut.side_to_side,
                nut.thickness,
                channel,
            ),
        );

        // Trim the unused corner so it does not get printed.
        let short = Depth::Blind(CUBE_TRIM_SHORT);
        let corner = Pos2::new(near, far);
        faces.push(
            Face::Top,
            FeatureRequest::cut_box(Pos2::new(0.0, far), CUBE_TRIM_LONG, CUBE_TRIM_SHORT, short),
        );
        faces.push(
            Face::Top,
            FeatureRequest::cut_box(
                Pos2::new(0.0, size - CUBE_TRIM_LONG),
                CUBE_TRIM_SHORT,
                CUBE_TRIM_LONG,
                short,
            ),
        );
        faces.push(
            Face::Top,
            FeatureRequest::cut_box(
                Pos2::new(0.0, far),
                CUBE_TRIM_SHORT,
                CUBE_TRIM_SHORT,
                Depth::Blind(CUBE_TRIM_LONG),
            ),
        );
        faces.push(Face::Top, FeatureRequest::hole(corner, CUBE_ROUND, short));
        faces.push(Face::Back, FeatureRequest::hole(Pos2::new(far, far), CUBE_ROUND, short));
        faces.push(Face::Left, FeatureRequest::hole(corner, CUBE_ROUND, short));
        faces.push(Face::Top, FeatureRequest::sphere(corner, CUBE_ROUND, CUBE_TRIM_SHORT));
        Ok(())
    }
}

fn power_supply(params: &PowerSupplyParams, faces: &mut FaceMap) {
    for mount in &params.mounts {
        for cut in &mount.cuts {
            let hole = FeatureRequest::hole(mount.pos, cut.diameter, cut.depth.into());
            faces.push(mount.face, if cut.external_subtract { hole.external() } else { hole });
        }
    }
}

fn fan(record: &VariantRecord, params: &FanParams, faces: &mut FaceMap) -> Result<(), BuildError> {
    let size = params.size;
    let hub = Pos2::new(size / 2.0, size / 2.0);
    let hub_diameter = size - 2.0 * FAN_BORDER;
    let depth: Depth = params.hole_depth.into();

    faces.push(Face::Top, FeatureRequest::hole(hub, hub_diameter, Depth::Blind(FAN_HUB_DEPTH)));
    faces.push(Face::Bottom, FeatureRequest::hole(hub, hub_diameter, Depth::Blind(FAN_HUB_DEPTH)));

    let edge = params.hole_from_edge();
    if params.internal {
        faces.push(Face::Top, FeatureRequest::hole(hub, size - 2.0, depth).external());
    } else {
        let plan = SlotArraySpec {
            size,
            edge_margin: edge,
            slot_width: FAN_SLOT_WIDTH,
            wall_width: FAN_WALL_WIDTH,
            side_pad: params.side_pad,
        }
        .plan()
        .map_err(|e| configuration(record, format!("vent slots: {}", e)))?;
        for slot in &plan.slots {
            faces.push(
                Face::Top,
                FeatureRequest::slot(slot.pos, slot.length, plan.slot_width, depth).external(),
            );
        }
    }

    let corners = [edge, size - edge];
    for u in corners {
        for v in corners {
            let pos = Pos2::new(u, v);
            faces.push(Face::Top, FeatureRequest::hole(pos, params.hole_diameter, depth).external());
            faces.push(Face::Top, FeatureRequest::hole(pos, FAN_SCREW_HOLE, Depth::Through));
        }
    }
    Ok(())
}

/// Part number and (x, y, z) size for a family.
pub fn envelope(family: &Family) -> (String, [f64; 3]) {
    match family {
        Family::Motherboard(params) => {
            let profile = params.form_factor.profile();
            (params.part_no(), [profile.x_size, profile.y_size, params.z_size()])
        }
        Family::PowerSupply(params) => {
            (params.part_no.clone(), [params.x_size, params.y_size, params.z_size])
        }
        Family::ConnectorCube(params) => {
            (params.part_no.clone(), [params.size, params.size, params.size])
        }
        Family::Fan(params) => (params.part_no(), [params.size, params.size, params.thickness]),
    }
}

fn configuration(record: &VariantRecord, detail: impl Into<String>) -> BuildError {
    BuildError::Configuration {
        variant: record.id.clone(),
        family: record.family.name().to_string(),
        detail: detail.into(),
    }
}

fn unknown(record: &VariantRecord, kind: &'static str, name: &str) -> BuildError {
    BuildError::UnknownReference {
        variant: record.id.clone(),
        kind,
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nuts::MetricNutTable;
    use crate::variants::{FormFactor, VariantRegistry};

    fn build(record: &VariantRecord) -> Result<PartSpec, BuildError> {
        let patterns = PatternCatalog::builtin();
        let nuts = MetricNutTable::new();
        FeatureBuilder::new(&patterns, &nuts).build(record)
    }

    fn board(params: MotherboardParams) -> VariantRecord {
        VariantRecord::new("board", "Board", Family::Motherboard(params))
    }

    #[test]
    fn test_standard_atx_hole_pairs() {
        let part = build(&board(MotherboardParams::new(FormFactor::StandardAtx))).unwrap();
        let top = &part.faces[Face::Top];
        let bottom = &part.faces[Face::Bottom];
        assert_eq!(top.len(), 12);
        assert_eq!(bottom.len(), top.len());
        for (upper, lower) in top.iter().zip(bottom) {
            assert_eq!(lower.pos().u, upper.pos().u);
            assert!((lower.pos().v - (part.y_size - upper.pos().v)).abs() < 1e-9);
            assert!(lower.is_external());
            assert!(!upper.is_external());
        }
    }

    #[test]
    fn test_trim_follows_holes_and_marks() {
        let part = build(&board(MotherboardParams::new(FormFactor::MicroAtx))).unwrap();
        let front = &part.faces[Face::Front];
        let kinds: Vec<_> = front.iter().map(FeatureRequest::kind).collect();
        assert_eq!(kinds, ["hole", "hole", "hole", "box"]);
        assert_eq!(front[3].pos(), Pos2::new(CONNECTOR_AREA, 0.0));
        assert_eq!(part.faces[Face::Left].len(), 1);
    }

    #[test]
    fn test_pcie_bays_are_pitched() {
        let params = MotherboardParams {
            pcie_cards: 3,
            pcie_full_height: true,
            ..MotherboardParams::new(FormFactor::StandardAtx)
        };
        let part = build(&board(params)).unwrap();
        let bays: Vec<_> = part.faces[Face::Front]
            .iter()
            .filter(|f| f.is_external())
            .collect();
        assert_eq!(bays.len(), 3);
        for (k, bay) in bays.iter().enumerate() {
            assert_eq!(bay.pos().u, 167.0 + k as f64 * 20.32);
            match bay {
                FeatureRequest::Box { width, .. } => assert_eq!(*width, PCIE_FULL_HEIGHT),
                other => panic!("expected box, got {}", other.kind()),
            }
        }
    }

    #[test]
    fn test_low_profile_board_uses_shifted_pattern() {
        let part = build(&board(MotherboardParams::new(FormFactor::MiniItxLowProfile))).unwrap();
        assert_eq!(part.faces[Face::Top].len(), 4);
        assert_eq!(part.faces[Face::Top][0].pos().u, 6.35 + 8.0);
        assert_eq!(part.faces[Face::Back].len(), 3);
        assert!(part.faces[Face::Front].is_empty());
    }

    #[test]
    fn test_inverted_hole_pair_is_rejected() {
        let params = MotherboardParams {
            clearance_diameter: 3.0,
            ..MotherboardParams::new(FormFactor::MiniItx)
        };
        let err = build(&board(params)).unwrap_err();
        assert!(matches!(err, BuildError::Configuration { .. }));
    }

    #[test]
    fn test_unknown_nut_fails_immediately() {
        let record = VariantRecord::new(
            "cube",
            "Cube",
            Family::ConnectorCube(ConnectorCubeParams {
                nut_type: "M99".to_string(),
                ..ConnectorCubeParams::default()
            }),
        );
        let err = build(&record).unwrap_err();
        assert!(err.to_string().contains("M99"));
    }

    #[test]
    fn test_connector_cube_layout() {
        let part = build(VariantRegistry::builtin().get("conn-cube").unwrap()).unwrap();
        assert_eq!(part.faces[Face::Front].len(), 4);
        assert_eq!(part.faces[Face::Bottom].len(), 4);
        assert_eq!(part.faces[Face::Right].len(), 4);
        assert_eq!(part.faces[Face::Top].len(), 7);
        assert_eq!(part.faces[Face::Back].len(), 2);
        assert_eq!(part.faces[Face::Top][0].pos(), Pos2::new(1.25, 1.0));
        match &part.faces[Face::Right][3] {
            FeatureRequest::NutRecess { vertical, pos, .. } => {
                assert!(*vertical);
                assert_eq!(*pos, Pos2::new(7.0, 7.0));
            }
            other => panic!("expected nut, got {}", other.kind()),
        }
    }

    #[test]
    fn test_external_fan_slots_then_mounts() {
        let part = build(VariantRegistry::builtin().get("fan-80x80x25").unwrap()).unwrap();
        let top = &part.faces[Face::Top];
        // hub, 8 slots, 4 corners x 2 holes
        assert_eq!(top.len(), 1 + 8 + 8);
        assert_eq!(top[1].kind(), "slot");
        assert_eq!(top[9].pos(), Pos2::new(4.25, 4.25));
    }

    #[test]
    fn test_internal_fan_has_no_slots() {
        let part =
            build(VariantRegistry::builtin().get("fan-80x80x25-internal").unwrap()).unwrap();
        assert!(part.faces[Face::Top].iter().all(|f| f.kind() == "hole"));
        assert_eq!(part.faces[Face::Top].len(), 1 + 1 + 8);
    }

    #[test]
    fn test_unregistered_pattern_is_unknown_reference() {
        let nuts = MetricNutTable::new();
        let record = board(MotherboardParams::new(FormFactor::StandardAtx));
        let err = FeatureBuilder::new(&PatternCatalog::new(), &nuts)
            .build(&record)
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_reference");
        assert!(err.to_string().contains("atx"));
    }

    #[test]
    fn test_bays_past_the_board_edge_fail_before_placement() {
        for cards in [5, u32::MAX] {
            let params = MotherboardParams {
                pcie_cards: cards,
                ..MotherboardParams::new(FormFactor::MicroAtx)
            };
            match build(&board(params)).unwrap_err() {
                BuildError::Configuration { detail, .. } => assert!(detail.contains("PCIe bays")),
                other => panic!("expected configuration error, got {}", other),
            }
        }
    }

    #[test]
    fn test_oversized_fan_is_a_configuration_error() {
        for size in [1e300, f64::INFINITY, MAX_PART_EXTENT + 1.0] {
            let record = VariantRecord::new("fan-huge", "Huge fan", Family::Fan(FanParams::new(size, 10.0)));
            let err = build(&record).unwrap_err();
            assert!(err.to_string().contains("at most"), "{}", err);
        }
    }

    #[test]
    fn test_tiny_fan_is_a_configuration_error() {
        let record = VariantRecord::new("fan-12", "12mm fan", Family::Fan(FanParams::new(12.0, 5.0)));
        let err = build(&record).unwrap_err();
        assert!(err.to_string().contains("vent slots"));
    }
}
