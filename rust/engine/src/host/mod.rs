// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The native element database.
//!
//! The analysis application keeps its model as named elements (points,
//! frames, areas) and named definitions (sections, materials, load
//! patterns). [`ElementDatabase`] is the seam between conversion logic and
//! that model: every read and write goes through it, so a conversion can run
//! against a live host or against [`MemoryDatabase`].

mod memory;

pub use memory::MemoryDatabase;

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use structsync_geometry::RectangularSection;
use structsync_model::{LoadDirection, LoadPatternKind, MaterialKind, Point, SurfacePropertyKind};

use crate::error::HostResult;

/// Section name the host always knows.
pub const DEFAULT_SECTION: &str = "Default";

/// Category of a named host object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Point,
    Frame,
    Area,
    FrameSection,
    AreaSection,
    Material,
    LoadPattern,
    Diaphragm,
}

impl ElementKind {
    pub const ELEMENTS: [ElementKind; 3] = [ElementKind::Point, ElementKind::Frame, ElementKind::Area];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Point => "Point",
            ElementKind::Frame => "Frame",
            ElementKind::Area => "Area",
            ElementKind::FrameSection => "FrameSection",
            ElementKind::AreaSection => "AreaSection",
            ElementKind::Material => "Material",
            ElementKind::LoadPattern => "LoadPattern",
            ElementKind::Diaphragm => "Diaphragm",
        }
    }

    /// Geometric elements, as opposed to definitions.
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self, ElementKind::Point | ElementKind::Frame | ElementKind::Area)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Point" => Ok(ElementKind::Point),
            "Frame" => Ok(ElementKind::Frame),
            "Area" => Ok(ElementKind::Area),
            "FrameSection" => Ok(ElementKind::FrameSection),
            "AreaSection" => Ok(ElementKind::AreaSection),
            "Material" => Ok(ElementKind::Material),
            "LoadPattern" => Ok(ElementKind::LoadPattern),
            "Diaphragm" => Ok(ElementKind::Diaphragm),
            other => Err(format!("unknown element kind '{other}'")),
        }
    }
}

/// Optional host features, probed once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Area connectivity can be changed directly instead of through the
    /// connectivity table
    pub area_connectivity_edit: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            area_connectivity_edit: true,
        }
    }
}

/// End releases of a frame. `true` marks a released degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EndReleases {
    pub end1: [bool; 6],
    pub end2: [bool; 6],
    pub end1_stiffness: [f64; 6],
    pub end2_stiffness: [f64; 6],
}

/// Assignable element property.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementProperty {
    Section(String),
    AreaSection(String),
    /// Local axis rotation in degrees
    LocalAxis(f64),
    Releases(EndReleases),
    Modifiers(Vec<f64>),
    Pier(String),
    Spandrel(String),
    Diaphragm(String),
    DesignProcedure(i32),
    CardinalPoint(i32),
    Opening(bool),
    /// Point restraint, `true` marks a fixed degree of freedom
    Restraint([bool; 6]),
}

/// Key of an [`ElementProperty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Section,
    AreaSection,
    LocalAxis,
    Releases,
    Modifiers,
    Pier,
    Spandrel,
    Diaphragm,
    DesignProcedure,
    CardinalPoint,
    Opening,
    Restraint,
}

impl ElementProperty {
    pub fn key(&self) -> PropertyKey {
        match self {
            ElementProperty::Section(_) => PropertyKey::Section,
            ElementProperty::AreaSection(_) => PropertyKey::AreaSection,
            ElementProperty::LocalAxis(_) => PropertyKey::LocalAxis,
            ElementProperty::Releases(_) => PropertyKey::Releases,
            ElementProperty::Modifiers(_) => PropertyKey::Modifiers,
            ElementProperty::Pier(_) => PropertyKey::Pier,
            ElementProperty::Spandrel(_) => PropertyKey::Spandrel,
            ElementProperty::Diaphragm(_) => PropertyKey::Diaphragm,
            ElementProperty::DesignProcedure(_) => PropertyKey::DesignProcedure,
            ElementProperty::CardinalPoint(_) => PropertyKey::CardinalPoint,
            ElementProperty::Opening(_) => PropertyKey::Opening,
            ElementProperty::Restraint(_) => PropertyKey::Restraint,
        }
    }
}

/// Named definition stored by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    FrameSection {
        material: Option<String>,
        rectangle: Option<RectangularSection>,
    },
    AreaSection {
        material: Option<String>,
        thickness: f64,
        kind: SurfacePropertyKind,
    },
    Material {
        kind: MaterialKind,
        elastic_modulus: f64,
        poisson_ratio: f64,
        density: f64,
    },
    LoadPattern {
        kind: LoadPatternKind,
        self_weight_multiplier: f64,
    },
    Diaphragm {
        semi_rigid: bool,
    },
}

impl Definition {
    pub fn kind(&self) -> ElementKind {
        match self {
            Definition::FrameSection { .. } => ElementKind::FrameSection,
            Definition::AreaSection { .. } => ElementKind::AreaSection,
            Definition::Material { .. } => ElementKind::Material,
            Definition::LoadPattern { .. } => ElementKind::LoadPattern,
            Definition::Diaphragm { .. } => ElementKind::Diaphragm,
        }
    }
}

/// Load assigned to an element under a load pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadAssignment {
    PointForce {
        pattern: String,
        direction: LoadDirection,
        value: f64,
    },
    FrameUniform {
        pattern: String,
        direction: LoadDirection,
        value: f64,
    },
    FramePoint {
        pattern: String,
        direction: LoadDirection,
        value: f64,
        /// Position along the frame, 0 to 1
        relative_distance: f64,
    },
    AreaUniform {
        pattern: String,
        direction: LoadDirection,
        value: f64,
    },
}

impl LoadAssignment {
    pub fn pattern(&self) -> &str {
        match self {
            LoadAssignment::PointForce { pattern, .. }
            | LoadAssignment::FrameUniform { pattern, .. }
            | LoadAssignment::FramePoint { pattern, .. }
            | LoadAssignment::AreaUniform { pattern, .. } => pattern,
        }
    }
}

/// A host table checked out for editing: field names and rows of text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditableTable {
    pub key: String,
    pub fields: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl EditableTable {
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    /// Row whose first column is `name`.
    pub fn row_mut(&mut self, name: &str) -> Option<&mut Vec<String>> {
        self.rows
            .iter_mut()
            .find(|row| row.first().map(String::as_str) == Some(name))
    }
}

/// Counts reported by the host after applying edited tables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableApplyReport {
    pub fatal_errors: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    pub import_log: String,
}

/// Operations the synchronizer needs from the host.
///
/// Element names are host-assigned strings. Calls that change the model
/// return [`HostError::Rejected`](crate::HostError::Rejected) with the
/// host's return code when refused.
pub trait ElementDatabase {
    /// Version string, e.g. `"19.1.0"`.
    fn program_version(&self) -> String;

    fn capabilities(&self) -> HostCapabilities;

    /// Add a point, returning the name of an existing coincident point if
    /// the host merges it.
    fn add_point(&mut self, at: Point) -> HostResult<String>;

    fn point_coordinates(&self, name: &str) -> HostResult<Point>;

    /// First point within `tolerance` of `at`.
    fn find_point(&self, at: Point, tolerance: f64) -> Option<String>;

    /// Number of frames and areas using the point.
    fn point_connectivity(&self, name: &str) -> HostResult<usize>;

    /// Delete a point that no element uses.
    fn delete_special_point(&mut self, name: &str) -> HostResult<()>;

    fn add_frame_by_coord(&mut self, start: Point, end: Point, section: &str) -> HostResult<String>;

    /// End point names (i, j).
    fn frame_points(&self, name: &str) -> HostResult<(String, String)>;

    fn change_frame_connectivity(&mut self, name: &str, point_i: &str, point_j: &str) -> HostResult<()>;

    fn add_area_by_coord(&mut self, points: &[Point], section: &str) -> HostResult<String>;

    fn area_points(&self, name: &str) -> HostResult<Vec<String>>;

    /// Only available when [`HostCapabilities::area_connectivity_edit`] is set.
    fn change_area_connectivity(&mut self, name: &str, points: &[String]) -> HostResult<()>;

    fn names(&self, kind: ElementKind) -> Vec<String>;

    fn guid(&self, kind: ElementKind, name: &str) -> HostResult<String>;

    fn set_guid(&mut self, kind: ElementKind, name: &str, guid: &str) -> HostResult<()>;

    fn rename(&mut self, kind: ElementKind, name: &str, new_name: &str) -> HostResult<()>;

    fn set_property(&mut self, kind: ElementKind, name: &str, property: ElementProperty) -> HostResult<()>;

    fn property(&self, kind: ElementKind, name: &str, key: PropertyKey) -> HostResult<Option<ElementProperty>>;

    fn delete(&mut self, kind: ElementKind, name: &str) -> HostResult<()>;

    /// Create or overwrite a named definition.
    fn define(&mut self, name: &str, definition: Definition) -> HostResult<()>;

    fn definition(&self, kind: ElementKind, name: &str) -> HostResult<Option<Definition>>;

    fn assign_load(&mut self, kind: ElementKind, name: &str, load: LoadAssignment) -> HostResult<()>;

    fn table_for_editing(&self, key: &str) -> HostResult<EditableTable>;

    /// Stage an edited table; nothing changes until
    /// [`apply_edited_tables`](Self::apply_edited_tables).
    fn set_table_for_editing(&mut self, table: EditableTable) -> HostResult<()>;

    fn apply_edited_tables(&mut self, fill_import_log: bool) -> HostResult<TableApplyReport>;

    fn exists(&self, kind: ElementKind, name: &str) -> bool {
        self.names(kind).iter().any(|n| n == name)
    }

    /// GUID of every element, mapped to its kind and name.
    fn guid_index(&self) -> FxHashMap<String, (ElementKind, String)> {
        let mut index = FxHashMap::default();
        for kind in ElementKind::ELEMENTS {
            for name in self.names(kind) {
                if let Ok(guid) = self.guid(kind, &name) {
                    if !guid.is_empty() {
                        index.insert(guid, (kind, name));
                    }
                }
            }
        }
        index
    }
}
