// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! StructSync Geometry
//!
//! Advisory display geometry for structural members. Surface members are
//! triangulated with interior-hole support and extruded by their thickness;
//! linear members become an eight-vertex box along their centerline.
//!
//! Nothing produced here is analytical truth. Every builder degrades to a
//! simpler mesh instead of failing the member that owns it.

pub mod error;
pub mod extrusion;
pub mod mesh;
pub mod profile;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use error::{Error, Result};
pub use extrusion::{
    connect_top_and_bottom, extrude_centerline, extrude_surface, extrude_wrapped, opening_mesh,
    polygon_mesh, translate_mesh,
};
pub use mesh::{Mesh, MeshTag};
pub use profile::{RectangularSection, VerticalAlignment};
pub use triangulation::{
    ear_clip_rings, fan_triangulate, project_to_2d, project_to_2d_with_basis, triangulate_rings,
};
