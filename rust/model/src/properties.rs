// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Section, surface and material definitions.

use serde::{Deserialize, Serialize};
use structsync_geometry::RectangularSection;

use crate::keys::ObjectKey;

/// Cross-section shape of a linear member.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SectionProfile {
    Rectangular {
        width: f64,
        depth: f64,
    },
    Circular {
        diameter: f64,
    },
    /// Named shape from a steel catalogue
    Catalogue {
        designation: String,
    },
    #[default]
    Undefined,
}

impl SectionProfile {
    /// Rectangular bounding dimensions, when the shape has any.
    pub fn rectangle(&self) -> Option<RectangularSection> {
        match self {
            SectionProfile::Rectangular { width, depth } => {
                Some(RectangularSection::new(*width, *depth))
            }
            SectionProfile::Circular { diameter } => {
                Some(RectangularSection::new(*diameter, *diameter))
            }
            SectionProfile::Catalogue { .. } | SectionProfile::Undefined => None,
        }
    }
}

/// Named section property of a linear member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionProperty {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<ObjectKey>,
    #[serde(default)]
    pub profile: SectionProfile,
}

/// Behaviour class of a surface property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SurfacePropertyKind {
    #[default]
    Slab,
    Wall,
    Deck,
    Shell,
}

/// Named property of a surface member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceProperty {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<ObjectKey>,
    pub thickness: f64,
    #[serde(default)]
    pub kind: SurfacePropertyKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MaterialKind {
    Steel,
    #[default]
    Concrete,
    Rebar,
    Aluminum,
    ColdFormed,
    Tendon,
    Other,
}

/// Isotropic structural material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default)]
    pub kind: MaterialKind,
    #[serde(default)]
    pub elastic_modulus: f64,
    #[serde(default)]
    pub poisson_ratio: f64,
    #[serde(default)]
    pub density: f64,
}

/// Floor diaphragm constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diaphragm {
    pub name: String,
    #[serde(default)]
    pub semi_rigid: bool,
}
