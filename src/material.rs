//! Material Tags
//!
//! Informational only. The builder never reads these; they travel with the
//! part so the modeling engine can pick a colour and a process.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colour {
    Black,
    Blue,
    Red,
    Grey,
    White,
}

impl Default for Colour {
    fn default() -> Self {
        Self::Grey
    }
}

/// How the part is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fabrication {
    /// Printed body; cuts apply to the part itself.
    Print3d,
    /// Placeholder volume; cuts mostly subtract from mating parts.
    Cuboid,
}

impl Default for Fabrication {
    fn default() -> Self {
        Self::Print3d
    }
}
