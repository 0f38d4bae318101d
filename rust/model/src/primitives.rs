// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric primitives and degree-of-freedom restraints.

use serde::{Deserialize, Serialize};
use structsync_geometry::Point3;

/// A point in model coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Coincidence test with an absolute tolerance.
    #[inline]
    pub fn coincides(&self, other: &Point, tolerance: f64) -> bool {
        self.distance_to(other) <= tolerance
    }

    #[inline]
    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Point {
    fn from(c: [f64; 3]) -> Self {
        Point::new(c[0], c[1], c[2])
    }
}

impl From<Point> for Point3<f64> {
    fn from(p: Point) -> Self {
        Point3::new(p.x, p.y, p.z)
    }
}

/// A straight segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }
}

/// Fixity of the six degrees of freedom (UX, UY, UZ, RX, RY, RZ).
///
/// The code holds one letter per degree of freedom: `F` fixed, `R` released,
/// `K` spring with the matching entry of `stiffness`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restraint {
    pub code: String,
    #[serde(default)]
    pub stiffness: [f64; 6],
}

impl Restraint {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            stiffness: [0.0; 6],
        }
    }

    pub fn fixed() -> Self {
        Self::new("FFFFFF")
    }

    pub fn pinned() -> Self {
        Self::new("FFFRRR")
    }

    pub fn released() -> Self {
        Self::new("RRRRRR")
    }

    /// Build a restraint from fixity flags (`true` = fixed).
    pub fn from_fixities(fixities: [bool; 6]) -> Self {
        Self::new(
            fixities
                .iter()
                .map(|&f| if f { 'F' } else { 'R' })
                .collect::<String>(),
        )
    }

    /// Fixity flags per degree of freedom. Missing letters count as released.
    pub fn fixities(&self) -> [bool; 6] {
        let mut fixities = [false; 6];
        for (slot, letter) in fixities.iter_mut().zip(self.code.chars()) {
            *slot = letter.eq_ignore_ascii_case(&'F');
        }
        fixities
    }

    /// Whether any degree of freedom is a spring.
    pub fn has_springs(&self) -> bool {
        self.code.chars().any(|c| c.eq_ignore_ascii_case(&'K'))
    }
}
