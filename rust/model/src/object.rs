// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Graph objects: identity, type discriminator, typed body and dynamic
//! members.

use serde::{Deserialize, Serialize};
use structsync_geometry::Mesh;

use crate::elements::{LinearMember, Node, SurfaceMember};
use crate::keys::ObjectKey;
use crate::loads::{BeamLoad, FaceLoad, LoadPattern, NodeLoad};
use crate::primitives::Line;
use crate::properties::{Diaphragm, Material, SectionProperty, SurfaceProperty};

/// Typed payload of a graph object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectBody {
    /// Container whose content lives in its members
    Collection { name: String },
    /// Object with no structural meaning of its own
    Generic,
    Node(Node),
    LinearMember(LinearMember),
    SurfaceMember(SurfaceMember),
    Line(Line),
    SectionProperty(SectionProperty),
    SurfaceProperty(SurfaceProperty),
    Material(Material),
    Diaphragm(Diaphragm),
    LoadPattern(LoadPattern),
    NodeLoad(NodeLoad),
    BeamLoad(BeamLoad),
    FaceLoad(FaceLoad),
    Mesh(Mesh),
}

impl ObjectBody {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectBody::Collection { .. } => ObjectKind::Collection,
            ObjectBody::Generic => ObjectKind::Generic,
            ObjectBody::Node(_) => ObjectKind::Node,
            ObjectBody::LinearMember(_) => ObjectKind::LinearMember,
            ObjectBody::SurfaceMember(_) => ObjectKind::SurfaceMember,
            ObjectBody::Line(_) => ObjectKind::Line,
            ObjectBody::SectionProperty(_) => ObjectKind::SectionProperty,
            ObjectBody::SurfaceProperty(_) => ObjectKind::SurfaceProperty,
            ObjectBody::Material(_) => ObjectKind::Material,
            ObjectBody::Diaphragm(_) => ObjectKind::Diaphragm,
            ObjectBody::LoadPattern(_) => ObjectKind::LoadPattern,
            ObjectBody::NodeLoad(_) => ObjectKind::NodeLoad,
            ObjectBody::BeamLoad(_) => ObjectKind::BeamLoad,
            ObjectBody::FaceLoad(_) => ObjectKind::FaceLoad,
            ObjectBody::Mesh(_) => ObjectKind::Mesh,
        }
    }
}

/// Discriminant for object bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Collection,
    Generic,
    Node,
    LinearMember,
    SurfaceMember,
    Line,
    SectionProperty,
    SurfaceProperty,
    Material,
    Diaphragm,
    LoadPattern,
    NodeLoad,
    BeamLoad,
    FaceLoad,
    Mesh,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Collection => "Collection",
            ObjectKind::Generic => "Generic",
            ObjectKind::Node => "Node",
            ObjectKind::LinearMember => "LinearMember",
            ObjectKind::SurfaceMember => "SurfaceMember",
            ObjectKind::Line => "Line",
            ObjectKind::SectionProperty => "SectionProperty",
            ObjectKind::SurfaceProperty => "SurfaceProperty",
            ObjectKind::Material => "Material",
            ObjectKind::Diaphragm => "Diaphragm",
            ObjectKind::LoadPattern => "LoadPattern",
            ObjectKind::NodeLoad => "NodeLoad",
            ObjectKind::BeamLoad => "BeamLoad",
            ObjectKind::FaceLoad => "FaceLoad",
            ObjectKind::Mesh => "Mesh",
        }
    }

    /// Type path written for objects built without an explicit one.
    pub fn default_type_path(&self) -> &'static str {
        match self {
            ObjectKind::Collection => "Objects.Organization.Collection",
            ObjectKind::Generic => "Base",
            ObjectKind::Node => "Objects.Structural.Geometry.Node",
            ObjectKind::LinearMember => "Objects.Structural.Geometry.Element1D",
            ObjectKind::SurfaceMember => "Objects.Structural.Geometry.Element2D",
            ObjectKind::Line => "Objects.Geometry.Line",
            ObjectKind::SectionProperty => "Objects.Structural.Properties.Property1D",
            ObjectKind::SurfaceProperty => "Objects.Structural.Properties.Property2D",
            ObjectKind::Material => "Objects.Structural.Materials.StructuralMaterial",
            ObjectKind::Diaphragm => "Objects.Structural.Properties.Diaphragm",
            ObjectKind::LoadPattern => "Objects.Structural.Loading.LoadCase",
            ObjectKind::NodeLoad => "Objects.Structural.Loading.LoadNode",
            ObjectKind::BeamLoad => "Objects.Structural.Loading.LoadBeam",
            ObjectKind::FaceLoad => "Objects.Structural.Loading.LoadFace",
            ObjectKind::Mesh => "Objects.Geometry.Mesh",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dynamic member value attached to an object by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Member {
    Object(ObjectKey),
    List(Vec<ObjectKey>),
    Text(String),
    Number(f64),
}

impl Member {
    /// Objects referenced by this member, in order.
    pub fn object_keys(&self) -> &[ObjectKey] {
        match self {
            Member::Object(key) => std::slice::from_ref(key),
            Member::List(keys) => keys,
            Member::Text(_) | Member::Number(_) => &[],
        }
    }
}

/// One object of the portable graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphObject {
    /// Content identity. Filled from a hash of the object when left empty.
    #[serde(default)]
    pub id: String,
    /// Identity assigned by the authoring application, stable across edits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    /// Dotted type discriminator, e.g. `Objects.Structural.Geometry.Node`
    pub type_path: String,
    pub body: ObjectBody,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<(String, Member)>,
}

impl GraphObject {
    /// Create an object with the default type path for its body.
    pub fn new(body: ObjectBody) -> Self {
        Self {
            id: String::new(),
            application_id: None,
            type_path: body.kind().default_type_path().to_string(),
            body,
            members: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }

    pub fn with_type_path(mut self, type_path: impl Into<String>) -> Self {
        self.type_path = type_path.into();
        self
    }

    pub fn with_member(mut self, name: impl Into<String>, member: Member) -> Self {
        self.members.push((name.into(), member));
        self
    }

    #[inline]
    pub fn kind(&self) -> ObjectKind {
        self.body.kind()
    }

    /// Last dotted segment of the type path.
    pub fn simplified_type(&self) -> &str {
        self.type_path
            .rsplit('.')
            .next()
            .unwrap_or(self.type_path.as_str())
    }

    /// Member by exact name.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|(member_name, _)| member_name == name)
            .map(|(_, member)| member)
    }

    /// First member present among `aliases`, probed in order.
    pub fn first_member<'a>(&'a self, aliases: &'a [String]) -> Option<(&'a str, &'a Member)> {
        aliases
            .iter()
            .find_map(|alias| self.member(alias).map(|m| (alias.as_str(), m)))
    }

    /// Identifier that survives re-export: the application id when present,
    /// the content id otherwise.
    pub fn stable_id(&self) -> &str {
        self.application_id.as_deref().unwrap_or(&self.id)
    }
}
