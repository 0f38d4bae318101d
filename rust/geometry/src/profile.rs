// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cross-section dimensions and insertion alignment for linear members

use serde::{Deserialize, Serialize};

/// Rectangular cross-section used to size a linear member's display box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectangularSection {
    /// Extent along the member's local right axis
    pub width: f64,
    /// Extent along the member's local up axis
    pub depth: f64,
}

impl RectangularSection {
    /// Create a section, replacing non-positive or non-finite dimensions
    /// with 1.0
    pub fn new(width: f64, depth: f64) -> Self {
        let sane = |v: f64| if v.is_finite() && v > 0.0 { v } else { 1.0 };
        Self {
            width: sane(width),
            depth: sane(depth),
        }
    }
}

impl Default for RectangularSection {
    /// Unit square, used when no section dimensions are known
    fn default() -> Self {
        Self {
            width: 1.0,
            depth: 1.0,
        }
    }
}

/// Vertical placement of a section relative to its centerline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerticalAlignment {
    /// Centerline runs along the bottom face
    Bottom,
    /// Centerline runs through the centroid
    #[default]
    Middle,
    /// Centerline runs along the top face
    Top,
}

impl VerticalAlignment {
    /// Map a cardinal insertion point (1-9, keypad layout) to an alignment.
    /// Rows 1-3 hang from the bottom, 4-6 sit in the middle, 7-9 on top.
    /// Anything else (centroid, shear center, unknown) is treated as middle.
    pub fn from_cardinal_point(cardinal: i32) -> Self {
        match cardinal {
            1..=3 => VerticalAlignment::Bottom,
            7..=9 => VerticalAlignment::Top,
            _ => VerticalAlignment::Middle,
        }
    }

    /// Offset of the section centroid from the centerline along local up
    #[inline]
    pub fn offset(&self, depth: f64) -> f64 {
        match self {
            VerticalAlignment::Bottom => depth / 2.0,
            VerticalAlignment::Middle => 0.0,
            VerticalAlignment::Top => -depth / 2.0,
        }
    }
}
