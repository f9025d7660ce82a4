//! Ventilation Slot Arrays
//!
//! Evenly spaced slots across a square vent. The pitch is floored to a whole
//! number of slots, so the realized step is usually wider than
//! `slot_width + wall_width`. The first and last slots are shortened so they
//! clear the mounting bosses in the corners.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::Pos2;

/// Length removed from the first and last slot.
pub const CORNER_TRIM: f64 = 20.0;
/// Offset applied to the first and last slot start.
pub const CORNER_SHIFT: f64 = 10.0;
/// Upper bound on slots in one array; far beyond any real vent.
pub const MAX_SLOTS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SlotArrayError {
    #[error("span {span:.3} cannot hold a single slot at pitch {pitch:.3}")]
    NoSlotsFit { span: f64, pitch: f64 },

    #[error("span {span:.3} at pitch {pitch:.3} needs more than {limit} slots")]
    TooManySlots { span: f64, pitch: f64, limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotArraySpec {
    pub size: f64,
    pub edge_margin: f64,
    pub slot_width: f64,
    pub wall_width: f64,
    pub side_pad: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedSlot {
    pub pos: Pos2,
    pub length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotArrayPlan {
    pub slot_count: usize,
    pub step: f64,
    pub slot_width: f64,
    pub slots: Vec<PlannedSlot>,
}

impl SlotArraySpec {
    pub fn plan(&self) -> Result<SlotArrayPlan, SlotArrayError> {
        let start = self.edge_margin;
        let end = self.size - self.edge_margin;
        let span = end - start;
        let pitch = self.slot_width + self.wall_width;

        let ratio = (span / pitch).floor();
        if ratio > MAX_SLOTS as f64 {
            return Err(SlotArrayError::TooManySlots { span, pitch, limit: MAX_SLOTS });
        }
        // NaN and negative ratios saturate to zero.
        let slot_count = ratio as usize;
        if slot_count < 1 {
            return Err(SlotArrayError::NoSlotsFit { span, pitch });
        }
        let step = span / slot_count as f64;

        let length = span - 2.0 * self.side_pad + self.slot_width;
        let offset = start - self.slot_width / 2.0 + self.side_pad;

        let slots = (0..=slot_count)
            .map(|n| {
                let v = start + n as f64 * step;
                if n == 0 || n == slot_count {
                    PlannedSlot {
                        pos: Pos2::new(offset + CORNER_SHIFT, v),
                        length: length - CORNER_TRIM,
                    }
                } else {
                    PlannedSlot {
                        pos: Pos2::new(offset, v),
                        length,
                    }
                }
            })
            .collect();

        Ok(SlotArrayPlan {
            slot_count,
            step,
            slot_width: self.slot_width,
            slots,
        })
    }
}
