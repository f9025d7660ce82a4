//! Variant Table - Families Are Data
//!
//! A variant record names a family and supplies that family's parameters.
//! Anything that differs between sizes of the same family is a lookup on a
//! parameter, never a separate code path.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::features::{Face, Pos2};
use crate::material::{Colour, Fabrication};

pub type VariantId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRecord {
    pub id: VariantId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_engine_min_version")]
    pub engine_min_version: String,
    #[serde(default)]
    pub colour: Colour,
    #[serde(default)]
    pub fabrication: Fabrication,
    pub family: Family,
    /// Geometry known to be missing or unverified.
    #[serde(default)]
    pub incomplete: Vec<IncompleteMarker>,
}

fn default_engine_min_version() -> String {
    "1.0.0".to_string()
}

impl VariantRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, family: Family) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            engine_min_version: default_engine_min_version(),
            colour: Colour::default(),
            fabrication: Fabrication::default(),
            family,
            incomplete: vec![],
        }
    }

    fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    fn coloured(mut self, colour: Colour) -> Self {
        self.colour = colour;
        self
    }

    fn fabricated(mut self, fabrication: Fabrication) -> Self {
        self.fabrication = fabrication;
        self
    }

    fn missing(mut self, face: Option<Face>, feature: &str, note: &str) -> Self {
        self.incomplete.push(IncompleteMarker {
            face,
            feature: feature.to_string(),
            note: note.to_string(),
        });
        self
    }

    pub fn is_complete(&self) -> bool {
        self.incomplete.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncompleteMarker {
    #[serde(default)]
    pub face: Option<Face>,
    pub feature: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Family {
    Motherboard(MotherboardParams),
    PowerSupply(PowerSupplyParams),
    ConnectorCube(ConnectorCubeParams),
    Fan(FanParams),
}

impl Family {
    pub fn name(&self) -> &'static str {
        match self {
            Family::Motherboard(_) => "motherboard",
            Family::PowerSupply(_) => "power-supply",
            Family::ConnectorCube(_) => "connector-cube",
            Family::Fan(_) => "fan",
        }
    }
}

// --- Motherboards ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormFactor {
    StandardAtx,
    MicroAtx,
    MiniItx,
    /// Mini-ITX with a low-profile card lying beside the board.
    MiniItxLowProfile,
}

/// Fixed per-form-factor constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardProfile {
    pub part_no: &'static str,
    pub x_size: f64,
    pub y_size: f64,
    /// Added to the standoff-derived height.
    pub extra_height: f64,
    pub pattern: &'static str,
    pub pattern_shift: Pos2,
    /// Face carrying the connector identification marks.
    pub mark_face: Face,
    /// Trim the material beside the connector area.
    pub edge_trim: bool,
}

/// Room the low-profile card needs beside the board. Measured from the long
/// edge of the bracket, excluding the 4 mm mounting lip.
pub const LOW_PROFILE_CARD_SPACE: f64 = 8.0;

impl FormFactor {
    pub fn profile(&self) -> BoardProfile {
        match self {
            FormFactor::StandardAtx => BoardProfile {
                part_no: "standard-atx-motherboard",
                x_size: 305.0,
                y_size: 244.0,
                extra_height: 0.0,
                pattern: "atx",
                pattern_shift: Pos2::new(0.0, 0.0),
                mark_face: Face::Front,
                edge_trim: true,
            },
            FormFactor::MicroAtx => BoardProfile {
                part_no: "micro-atx-motherboard",
                x_size: 243.84,
                y_size: 243.84,
                extra_height: 0.0,
                pattern: "atx",
                pattern_shift: Pos2::new(0.0, 0.0),
                mark_face: Face::Front,
                edge_trim: true,
            },
            FormFactor::MiniItx => BoardProfile {
                part_no: "mini-itx-motherboard",
                x_size: 170.0,
                y_size: 170.0,
                extra_height: 0.0,
                pattern: "atx",
                pattern_shift: Pos2::new(0.0, 0.0),
                mark_face: Face::Front,
                edge_trim: true,
            },
            FormFactor::MiniItxLowProfile => BoardProfile {
                part_no: "mini-itx-motherboard-lp-pci",
                // 172.62 = 6.35 + 7.52 + 158.75, rounded up.
                x_size: 173.0 + LOW_PROFILE_CARD_SPACE,
                // Measured 2 mm over the PCB.
                y_size: 172.0,
                extra_height: 29.0,
                pattern: "mini-itx",
                pattern_shift: Pos2::new(LOW_PROFILE_CARD_SPACE, 0.0),
                mark_face: Face::Back,
                edge_trim: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotherboardParams {
    pub form_factor: FormFactor,
    #[serde(default = "default_standoff")]
    pub standoff: f64,
    #[serde(default)]
    pub pcie_cards: u32,
    #[serde(default)]
    pub pcie_full_height: bool,
    /// Board-side hole, the screw passes through it.
    #[serde(default = "default_clearance_diameter")]
    pub clearance_diameter: f64,
    /// Tray-side hole the screw threads into.
    #[serde(default = "default_fit_diameter")]
    pub fit_diameter: f64,
}

fn default_standoff() -> f64 {
    8.0
}

fn default_clearance_diameter() -> f64 {
    4.0
}

fn default_fit_diameter() -> f64 {
    3.2
}

impl MotherboardParams {
    pub fn new(form_factor: FormFactor) -> Self {
        Self {
            form_factor,
            standoff: default_standoff(),
            pcie_cards: 0,
            pcie_full_height: false,
            clearance_diameter: default_clearance_diameter(),
            fit_diameter: default_fit_diameter(),
        }
    }

    /// Board plus components plus standoff, less the 2 mm tray.
    pub fn z_size(&self) -> f64 {
        47.0 + (self.standoff - 2.0) + self.form_factor.profile().extra_height
    }

    pub fn part_no(&self) -> String {
        let base = self.form_factor.profile().part_no;
        if self.pcie_cards == 0 {
            return base.to_string();
        }
        let height = if self.pcie_full_height { "full" } else { "half" };
        format!("{}-{}{}", base, self.pcie_cards, height)
    }
}

// --- Power supplies ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoleCut {
    pub diameter: f64,
    /// None cuts through.
    #[serde(default)]
    pub depth: Option<f64>,
    #[serde(default)]
    pub external_subtract: bool,
}

impl HoleCut {
    pub const fn clearance(diameter: f64) -> Self {
        Self {
            diameter,
            depth: None,
            external_subtract: true,
        }
    }

    pub const fn blind(diameter: f64, depth: f64) -> Self {
        Self {
            diameter,
            depth: Some(depth),
            external_subtract: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountPoint {
    pub face: Face,
    pub pos: Pos2,
    pub cuts: Vec<HoleCut>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerSupplyParams {
    pub part_no: String,
    pub x_size: f64,
    pub y_size: f64,
    pub z_size: f64,
    #[serde(default)]
    pub mounts: Vec<MountPoint>,
}

impl PowerSupplyParams {
    fn mount(mut self, face: Face, u: f64, v: f64, cuts: &[HoleCut]) -> Self {
        self.mounts.push(MountPoint {
            face,
            pos: Pos2::new(u, v),
            cuts: cuts.to_vec(),
        });
        self
    }
}

// --- Connector cube ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorCubeParams {
    #[serde(default = "default_cube_part_no")]
    pub part_no: String,
    #[serde(default = "default_cube_size")]
    pub size: f64,
    #[serde(default = "default_cube_nut")]
    pub nut_type: String,
}

fn default_cube_part_no() -> String {
    "conn-cube".to_string()
}

fn default_cube_size() -> f64 {
    11.0
}

fn default_cube_nut() -> String {
    "M3".to_string()
}

impl Default for ConnectorCubeParams {
    fn default() -> Self {
        Self {
            part_no: default_cube_part_no(),
            size: default_cube_size(),
            nut_type: default_cube_nut(),
        }
    }
}

// --- Fans ---

/// Mounting-hole distance from the fan edge, for sizes where it differs
/// from [`DEFAULT_FAN_HOLE_FROM_EDGE`].
pub const FAN_HOLE_FROM_EDGE: &[(f64, f64)] = &[(80.0, 4.25)];
pub const DEFAULT_FAN_HOLE_FROM_EDGE: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanParams {
    pub size: f64,
    pub thickness: f64,
    /// Internal fans get one large opening, external fans a slot array.
    #[serde(default)]
    pub internal: bool,
    /// None cuts through.
    #[serde(default)]
    pub hole_depth: Option<f64>,
    #[serde(default = "default_fan_hole_diameter")]
    pub hole_diameter: f64,
    /// Extra material left at both slot ends. Stiffer, less air.
    #[serde(default)]
    pub side_pad: f64,
}

fn default_fan_hole_diameter() -> f64 {
    4.5
}

impl FanParams {
    pub fn new(size: f64, thickness: f64) -> Self {
        Self {
            size,
            thickness,
            internal: false,
            hole_depth: None,
            hole_diameter: 3.2,
            side_pad: 0.0,
        }
    }

    pub fn hole_from_edge(&self) -> f64 {
        FAN_HOLE_FROM_EDGE
            .iter()
            .find(|(size, _)| *size == self.size)
            .map_or(DEFAULT_FAN_HOLE_FROM_EDGE, |(_, edge)| *edge)
    }

    pub fn part_no(&self) -> String {
        let base = format!("fan_{}x{}x{}", self.size, self.size, self.thickness);
        if self.internal {
            format!("{}-internal", base)
        } else {
            base
        }
    }
}

// --- Registry ---

/// Variant registry - built-in table plus records loaded from disk
pub struct VariantRegistry {
    variants: BTreeMap<VariantId, VariantRecord>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self {
            variants: BTreeMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for record in builtin_variants() {
            registry.register(record);
        }
        registry
    }

    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut registry = Self::new();
        registry.extend_from_dir(dir)?;
        Ok(registry)
    }

    /// Add every `*.json` record in `dir`, replacing built-ins with the same id.
    pub fn extend_from_dir(&mut self, dir: &Path) -> Result<usize, std::io::Error> {
        let mut loaded = 0;
        if !dir.exists() {
            return Ok(loaded);
        }
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map_or(false, |e| e == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let record = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    serde_json::from_str::<VariantRecord>(&content).map_err(|e| e.to_string())
                });
            match record {
                Ok(record) => {
                    tracing::debug!(id = %record.id, path = %path.display(), "loaded variant");
                    self.register(record);
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "skipping variant file: {}", e);
                }
            }
        }
        Ok(loaded)
    }

    pub fn get(&self, id: &str) -> Option<&VariantRecord> {
        self.variants.get(id)
    }

    pub fn list(&self) -> Vec<&VariantRecord> {
        self.variants.values().collect()
    }

    pub fn register(&mut self, record: VariantRecord) {
        self.variants.insert(record.id.clone(), record);
    }
}

impl Default for VariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Every variant the part library ships.
pub fn builtin_variants() -> Vec<VariantRecord> {
    let mut variants = motherboards();
    variants.extend(power_supplies());
    variants.push(
        VariantRecord::new(
            "conn-cube",
            "Connector cube",
            Family::ConnectorCube(ConnectorCubeParams::default()),
        )
        .describe("Joins three panels with M3 bolts."),
    );
    variants.extend(fans());
    variants
}

fn motherboards() -> Vec<VariantRecord> {
    let board = |id: &str, name: &str, params: MotherboardParams| {
        VariantRecord::new(id, name, Family::Motherboard(params))
            .coloured(Colour::Blue)
            .describe("Desktop board on 8 mm standoffs.")
    };
    let with_cards = |form_factor, cards, full_height| MotherboardParams {
        pcie_cards: cards,
        pcie_full_height: full_height,
        ..MotherboardParams::new(form_factor)
    };

    vec![
        board("standard-atx", "Standard ATX", MotherboardParams::new(FormFactor::StandardAtx)),
        board(
            "standard-atx-2full",
            "Standard ATX, two full-height cards",
            with_cards(FormFactor::StandardAtx, 2, true),
        ),
        board("micro-atx", "Micro ATX", MotherboardParams::new(FormFactor::MicroAtx)),
        board(
            "micro-atx-1half",
            "Micro ATX, one low-profile card",
            with_cards(FormFactor::MicroAtx, 1, false),
        ),
        board("mini-itx", "Mini-ITX", MotherboardParams::new(FormFactor::MiniItx)),
        board(
            "mini-itx-lp-pcie",
            "Mini-ITX with low-profile PCIe card",
            MotherboardParams::new(FormFactor::MiniItxLowProfile),
        )
        .missing(Some(Face::Left), "pcie-card-mounting-holes", "card bracket holes not measured")
        .missing(Some(Face::Left), "nic-vents", "vent slots for the NIC not defined"),
    ]
}

fn power_supplies() -> Vec<VariantRecord> {
    let psu = |id: &str, name: &str, params: PowerSupplyParams| {
        VariantRecord::new(id, name, Family::PowerSupply(params)).coloured(Colour::Black)
    };
    let bare = |part_no: &str, x_size, y_size, z_size| PowerSupplyParams {
        part_no: part_no.to_string(),
        x_size,
        y_size,
        z_size,
        mounts: vec![],
    };

    // ATX PS2. Back is the C14 inlet side, top carries the label.
    let atx_edge = (150.0 - 138.0) / 2.0;
    let atx_top = 86.0 - atx_edge;
    let atx_cuts = [HoleCut::blind(4.2, 4.0), HoleCut::clearance(3.2)];
    let atx = bare("psu-atx-generic", 150.0, 140.0, 86.0)
        .mount(Face::Back, atx_edge, atx_top, &atx_cuts)
        .mount(Face::Back, atx_edge + 138.0, atx_top, &atx_cuts)
        .mount(Face::Back, atx_edge, atx_top - 64.0, &atx_cuts)
        .mount(Face::Back, atx_edge + 114.0, atx_edge, &atx_cuts);

    // Flex-ATX back holes are 32 mm apart.
    let flex_back = [HoleCut::clearance(4.2)];
    let flex_side = [HoleCut::clearance(3.2), HoleCut::blind(3.0, 41.0)];
    let flex_z: f64 = 40.5;
    let flex_y: f64 = 150.0;
    // 2.6 mm is the connector-plate overhang.
    let from_bottom = 8.2 + 2.6;
    let from_front_0 = 6.0 + 2.6;
    let from_front_r = 128.6 + 2.6;
    let from_front_l = 120.0 + 2.6;
    let silverstone = bare("psu-flexatx-silverstonetek", 81.5, flex_y, flex_z)
        .mount(Face::Back, 4.0, (flex_z - 32.0) / 2.0, &flex_back)
        .mount(Face::Back, 4.0, (flex_z - 32.0) / 2.0 + 32.0, &flex_back)
        .mount(Face::Left, flex_y - from_front_0, from_bottom, &flex_side)
        .mount(Face::Left, flex_y - from_front_l, from_bottom, &flex_side)
        .mount(Face::Right, from_front_0, from_bottom, &flex_side)
        .mount(Face::Right, from_front_r, from_bottom, &flex_side);

    let apevia_top = flex_z - 10.2;
    let apevia_cut = [HoleCut::clearance(3.2)];
    let apevia = bare("psu-apevia", 81.5, flex_y, flex_z)
        .mount(Face::Left, 4.1, apevia_top, &apevia_cut)
        .mount(Face::Left, 81.5 - 4.1, apevia_top, &apevia_cut)
        .mount(Face::Right, 24.04, apevia_top, &apevia_cut)
        .mount(Face::Right, 81.5 - 4.1, apevia_top, &apevia_cut);

    let meanwell_x = 114.3;
    let meanwell_y = 215.0;
    let mut meanwell = bare("psu-meanwell-15v", meanwell_x, meanwell_y, 50.0);
    for u in [32.0, meanwell_x - 32.0] {
        for v in [32.0, meanwell_y - 32.0] {
            meanwell = meanwell.mount(Face::Bottom, u, v, &[HoleCut::clearance(4.2)]);
        }
    }

    vec![
        psu("psu-atx-generic", "ATX PS2 power supply", atx)
            .describe("PS2 form; PS3 shares the holes but is shorter.")
            .missing(Some(Face::Back), "c14-inlet-box", "inlet cut-out not defined")
            .missing(None, "air-vents", "vent holes not defined")
            .missing(None, "fan-construction-box", "internal fan volume not defined")
            .missing(None, "cable-construction-box", "cable exit volume not defined"),
        psu("psu-flexatx-silverstonetek", "SilverStone Flex-ATX", silverstone)
            .missing(Some(Face::Back), "mounting-hole-offset", "4 mm offset measured, not on drawing")
            .missing(Some(Face::Back), "c14-inlet-box", "inlet cut-out not defined")
            .missing(Some(Face::Back), "c14-inlet-screws", "screws under the inlet not defined")
            .missing(None, "air-vents", "vent holes not defined")
            .missing(None, "fan-construction-box", "internal fan volume not defined")
            .missing(None, "cable-construction-box", "cable exit volume not defined"),
        psu("psu-apevia", "Apevia Flex-ATX", apevia),
        psu("psu-meanwell-15v", "Mean Well 15 V", meanwell).coloured(Colour::Red),
    ]
}

fn fans() -> Vec<VariantRecord> {
    let fan = |id: &str, params: FanParams| {
        let name = format!("{}mm fan", params.size);
        VariantRecord::new(id, name, Family::Fan(params))
            .coloured(Colour::Black)
            .fabricated(Fabrication::Cuboid)
    };
    let internal = FanParams {
        internal: true,
        ..FanParams::new(80.0, 25.0)
    };

    vec![
        fan("fan-40x40x10", FanParams::new(40.0, 10.0)),
        fan("fan-80x80x15", FanParams::new(80.0, 15.0)),
        fan("fan-80x80x25", FanParams::new(80.0, 25.0)),
        fan("fan-80x80x25-internal", internal),
        fan("fan-120x120x25", FanParams::new(120.0, 25.0)),
    ]
}
