// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Analytical structural elements.
//!
//! Members reference their nodes and properties by [`ObjectKey`], so a node
//! shared by a beam and a column is one object in the graph.

use serde::{Deserialize, Serialize};

use crate::keys::ObjectKey;
use crate::primitives::{Line, Point, Restraint};

/// A point with an optional native name and support restraint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub base_point: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restraint: Option<Restraint>,
}

impl Node {
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            name: None,
            base_point: Point::new(x, y, z),
            restraint: None,
        }
    }
}

/// Structural role of a linear member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LinearMemberType {
    Beam,
    Column,
    Brace,
    Link,
    #[default]
    Other,
}

impl LinearMemberType {
    /// Classify a centerline by its direction: level lines are beams, plumb
    /// lines are columns, anything else is a brace.
    pub fn from_direction(dx: f64, dy: f64, dz: f64) -> Self {
        const TOLERANCE: f64 = 1e-3;
        if dz.abs() < TOLERANCE {
            LinearMemberType::Beam
        } else if dx.abs() < TOLERANCE && dy.abs() < TOLERANCE {
            LinearMemberType::Column
        } else {
            LinearMemberType::Brace
        }
    }
}

/// Design code family a frame is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DesignProcedure {
    ProgramDetermined,
    Steel,
    Concrete,
    CompositeBeam,
    SteelJoist,
    NoDesign,
    CompositeColumn,
}

impl DesignProcedure {
    /// Numeric code understood by the analysis database.
    pub fn code(&self) -> i32 {
        match self {
            DesignProcedure::ProgramDetermined => 0,
            DesignProcedure::Steel => 1,
            DesignProcedure::Concrete => 2,
            DesignProcedure::CompositeBeam => 3,
            DesignProcedure::SteelJoist => 4,
            DesignProcedure::NoDesign => 7,
            DesignProcedure::CompositeColumn => 13,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => DesignProcedure::ProgramDetermined,
            1 => DesignProcedure::Steel,
            2 => DesignProcedure::Concrete,
            3 => DesignProcedure::CompositeBeam,
            4 => DesignProcedure::SteelJoist,
            7 => DesignProcedure::NoDesign,
            13 => DesignProcedure::CompositeColumn,
            _ => return None,
        })
    }
}

/// A 1D element between two nodes or along a centerline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub member_type: LinearMemberType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end1_node: Option<ObjectKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end2_node: Option<ObjectKey>,
    /// Centerline used when the end nodes are absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_line: Option<Line>,
    /// Section property object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<ObjectKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end1_releases: Option<Restraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end2_releases: Option<Restraint>,
    /// Rotation about the member axis, in radians
    #[serde(default)]
    pub orientation_angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stiffness_modifiers: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spandrel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_procedure: Option<DesignProcedure>,
    /// Cardinal insertion point (1-11), 10 (centroid) when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinal_point: Option<i32>,
}

impl LinearMember {
    pub fn between(end1: ObjectKey, end2: ObjectKey) -> Self {
        Self {
            end1_node: Some(end1),
            end2_node: Some(end2),
            ..Default::default()
        }
    }

    pub fn along(line: Line) -> Self {
        Self {
            base_line: Some(line),
            ..Default::default()
        }
    }
}

/// Structural role of a surface member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SurfaceMemberType {
    #[default]
    Slab,
    Wall,
    Deck,
    Generic,
}

/// A 2D element bounded by a ring of nodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub member_type: SurfaceMemberType,
    /// Outer ring, in order
    pub topology: Vec<ObjectKey>,
    /// Interior opening rings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<ObjectKey>>,
    /// Surface property object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<ObjectKey>,
    /// Rotation of the local axes, in radians
    #[serde(default)]
    pub orientation_angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stiffness_modifiers: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diaphragm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spandrel: Option<String>,
    /// The whole member is an opening in the surrounding floor
    #[serde(default)]
    pub is_opening: bool,
}

impl SurfaceMember {
    pub fn bounded_by(topology: Vec<ObjectKey>) -> Self {
        Self {
            topology,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_type_from_direction() {
        assert_eq!(
            LinearMemberType::from_direction(5.0, 0.0, 0.0),
            LinearMemberType::Beam
        );
        assert_eq!(
            LinearMemberType::from_direction(0.0, 0.0, 3.0),
            LinearMemberType::Column
        );
        assert_eq!(
            LinearMemberType::from_direction(4.0, 0.0, 3.0),
            LinearMemberType::Brace
        );
    }

    #[test]
    fn test_design_procedure_codes() {
        for procedure in [
            DesignProcedure::ProgramDetermined,
            DesignProcedure::Steel,
            DesignProcedure::Concrete,
            DesignProcedure::CompositeBeam,
            DesignProcedure::SteelJoist,
            DesignProcedure::NoDesign,
            DesignProcedure::CompositeColumn,
        ] {
            assert_eq!(DesignProcedure::from_code(procedure.code()), Some(procedure));
        }
        assert_eq!(DesignProcedure::NoDesign.code(), 7);
        assert_eq!(DesignProcedure::from_code(5), None);
    }
}
