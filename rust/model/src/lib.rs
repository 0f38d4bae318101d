// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # StructSync Model
//!
//! The portable side of a structural model: an arena of objects, each with
//! a content id, an optional application id, a dotted type path, a typed
//! body and free-form named members.
//!
//! Structural bodies cover nodes, linear and surface members, section,
//! surface and material definitions, diaphragms, load patterns and element
//! loads. Display geometry travels as [`Mesh`](structsync_geometry::Mesh)
//! objects hung off a `displayValue` member.
//!
//! ## Example
//!
//! ```rust
//! use structsync_model::*;
//!
//! let mut graph = ObjectGraph::new();
//! let a = graph.add(GraphObject::new(ObjectBody::Node(Node::at(0.0, 0.0, 0.0))));
//! let b = graph.add(GraphObject::new(ObjectBody::Node(Node::at(6.0, 0.0, 0.0))));
//! let beam = graph.add(
//!     GraphObject::new(ObjectBody::LinearMember(LinearMember::between(a, b)))
//!         .with_application_id("B1"),
//! );
//! graph.add_root(
//!     GraphObject::new(ObjectBody::Collection { name: "Level 1".into() })
//!         .with_member("elements", Member::List(vec![beam])),
//! );
//! assert_eq!(graph.len(), 4);
//! ```

pub mod elements;
pub mod error;
pub mod graph;
pub mod keys;
pub mod loads;
pub mod object;
pub mod primitives;
pub mod properties;
pub mod serialization;

pub use elements::{
    DesignProcedure, LinearMember, LinearMemberType, Node, SurfaceMember, SurfaceMemberType,
};
pub use error::{Error, Result};
pub use graph::{content_id, ObjectGraph};
pub use keys::ObjectKey;
pub use loads::{BeamLoad, BeamLoadKind, FaceLoad, LoadDirection, LoadPattern, LoadPatternKind, NodeLoad};
pub use object::{GraphObject, Member, ObjectBody, ObjectKind};
pub use primitives::{Line, Point, Restraint};
pub use properties::{
    Diaphragm, Material, MaterialKind, SectionProfile, SectionProperty, SurfaceProperty,
    SurfacePropertyKind,
};
