//! Feature Requests - What The Modeling Engine Receives
//!
//! Faces are a fixed enumeration. Each face owns an ordered list of
//! requests; order is significant because later cuts refine earlier ones.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::Index;

/// A face-local position in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pos2 {
    pub u: f64,
    pub v: f64,
}

impl Pos2 {
    pub const fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }
}

impl fmt::Display for Pos2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.u, self.v)
    }
}

/// Width/height of a face-local coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub u: f64,
    pub v: f64,
}

impl Extent {
    pub const fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }

    /// Strictly inside the far edges. Used to select candidate features.
    pub fn admits(&self, pos: Pos2) -> bool {
        pos.u < self.u && pos.v < self.v
    }

    /// Inside or on the boundary. Used to validate placed features.
    pub fn contains(&self, pos: Pos2) -> bool {
        (0.0..=self.u).contains(&pos.u) && (0.0..=self.v).contains(&pos.v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    Top,
    Bottom,
    Front,
    Back,
    Left,
    Right,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Top,
        Face::Bottom,
        Face::Front,
        Face::Back,
        Face::Left,
        Face::Right,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Face::Top => "top",
            Face::Bottom => "bottom",
            Face::Front => "front",
            Face::Back => "back",
            Face::Left => "left",
            Face::Right => "right",
        }
    }

    /// Face-local extent for a part of the given size.
    ///
    /// top/bottom span (x, y), front/back span (x, z), left/right span (y, z).
    pub fn extent(&self, x_size: f64, y_size: f64, z_size: f64) -> Extent {
        match self {
            Face::Top | Face::Bottom => Extent::new(x_size, y_size),
            Face::Front | Face::Back => Extent::new(x_size, z_size),
            Face::Left | Face::Right => Extent::new(y_size, z_size),
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How far a cut goes into the material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Through,
    Blind(f64),
}

impl From<Option<f64>> for Depth {
    fn from(depth: Option<f64>) -> Self {
        depth.map_or(Depth::Through, Depth::Blind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FeatureRequest {
    Hole {
        pos: Pos2,
        diameter: f64,
        depth: Depth,
        external_subtract: bool,
    },
    Slot {
        pos: Pos2,
        length: f64,
        width: f64,
        depth: Depth,
        external_subtract: bool,
    },
    Box {
        pos: Pos2,
        length: f64,
        width: f64,
        depth: Depth,
        external_subtract: bool,
    },
    NutRecess {
        pos: Pos2,
        nut_type: String,
        sink: f64,
        vertical: bool,
    },
    Sphere {
        pos: Pos2,
        diameter: f64,
        sink: f64,
    },
}

impl FeatureRequest {
    pub fn hole(pos: Pos2, diameter: f64, depth: Depth) -> Self {
        Self::Hole {
            pos,
            diameter,
            depth,
            external_subtract: false,
        }
    }

    pub fn slot(pos: Pos2, length: f64, width: f64, depth: Depth) -> Self {
        Self::Slot {
            pos,
            length,
            width,
            depth,
            external_subtract: false,
        }
    }

    pub fn cut_box(pos: Pos2, length: f64, width: f64, depth: Depth) -> Self {
        Self::Box {
            pos,
            length,
            width,
            depth,
            external_subtract: false,
        }
    }

    pub fn nut(pos: Pos2, nut_type: impl Into<String>, sink: f64, vertical: bool) -> Self {
        Self::NutRecess {
            pos,
            nut_type: nut_type.into(),
            sink,
            vertical,
        }
    }

    pub fn sphere(pos: Pos2, diameter: f64, sink: f64) -> Self {
        Self::Sphere { pos, diameter, sink }
    }

    /// Mark the cut as a clearance for the mating part. No-op for nuts and spheres.
    pub fn external(mut self) -> Self {
        match &mut self {
            Self::Hole { external_subtract, .. }
            | Self::Slot { external_subtract, .. }
            | Self::Box { external_subtract, .. } => *external_subtract = true,
            Self::NutRecess { .. } | Self::Sphere { .. } => {}
        }
        self
    }

    pub fn pos(&self) -> Pos2 {
        match self {
            Self::Hole { pos, .. }
            | Self::Slot { pos, .. }
            | Self::Box { pos, .. }
            | Self::NutRecess { pos, .. }
            | Self::Sphere { pos, .. } => *pos,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hole { .. } => "hole",
            Self::Slot { .. } => "slot",
            Self::Box { .. } => "box",
            Self::NutRecess { .. } => "nut",
            Self::Sphere { .. } => "sphere",
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::Hole { external_subtract: true, .. }
                | Self::Slot { external_subtract: true, .. }
                | Self::Box { external_subtract: true, .. }
        )
    }

    /// Named sizes that must be strictly positive.
    pub fn dimensions(&self) -> Vec<(&'static str, f64)> {
        let mut dims = match self {
            Self::Hole { diameter, .. } | Self::Sphere { diameter, .. } => {
                vec![("diameter", *diameter)]
            }
            Self::Slot { length, width, .. } | Self::Box { length, width, .. } => {
                vec![("length", *length), ("width", *width)]
            }
            Self::NutRecess { .. } => vec![],
        };
        if let Self::Hole { depth: Depth::Blind(d), .. }
        | Self::Slot { depth: Depth::Blind(d), .. }
        | Self::Box { depth: Depth::Blind(d), .. } = self
        {
            dims.push(("depth", *d));
        }
        dims
    }
}

/// Ordered feature lists for all six faces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceMap {
    faces: [Vec<FeatureRequest>; 6],
}

impl FaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, face: Face, feature: FeatureRequest) {
        self.faces[face.index()].push(feature);
    }

    pub fn get(&self, face: Face) -> &[FeatureRequest] {
        &self.faces[face.index()]
    }

    /// Every (face, index, feature) in face order, then request order.
    pub fn iter(&self) -> impl Iterator<Item = (Face, usize, &FeatureRequest)> {
        Face::ALL.into_iter().flat_map(move |face| {
            self.get(face)
                .iter()
                .enumerate()
                .map(move |(idx, feature)| (face, idx, feature))
        })
    }

    pub fn len(&self) -> usize {
        self.faces.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Index<Face> for FaceMap {
    type Output = [FeatureRequest];

    fn index(&self, face: Face) -> &Self::Output {
        self.get(face)
    }
}

impl Serialize for FaceMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Face::ALL.len()))?;
        for face in Face::ALL {
            map.serialize_entry(face.name(), self.get(face))?;
        }
        map.end()
    }
}
