// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures
//!
//! Faces use a variable-arity layout: each face is written as its vertex
//! count followed by that many vertex indices, so triangles, quads and
//! n-gons share one buffer. The legacy prefixes `0` (triangle) and `1`
//! (quad) are accepted when reading.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// What produced a mesh. Consumers use it to tell solids from fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshTag {
    /// Flat polygon of a surface outline
    SurfacePolygon,
    /// Surface extruded by its thickness
    SurfaceExtrusion,
    /// Every ring extruded on its own, holes ignored
    WrappedFallback,
    /// Box swept along a linear member's centerline
    LinearExtrusion,
    /// Copy of another mesh moved along -Z
    TranslatedCopy,
    /// Two parallel polygons stitched by side quads
    SideConnected,
    /// Flat marker for an opening in a surface
    OpeningIndicator,
}

impl MeshTag {
    /// Stable name used in exported display values
    pub fn as_str(&self) -> &'static str {
        match self {
            MeshTag::SurfacePolygon => "polygon",
            MeshTag::SurfaceExtrusion => "extrusion_surface",
            MeshTag::WrappedFallback => "wrapped_fallback",
            MeshTag::LinearExtrusion => "extrusion_dynamic",
            MeshTag::TranslatedCopy => "translated",
            MeshTag::SideConnected => "side_connected",
            MeshTag::OpeningIndicator => "opening",
        }
    }

    /// True for meshes produced by a degraded path
    #[inline]
    pub fn is_fallback(&self) -> bool {
        matches!(self, MeshTag::WrappedFallback)
    }
}

/// Polygon mesh with variable-arity faces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<f64>,
    /// Face buffer: `[n, i0, .., in-1, n, ...]`
    pub faces: Vec<usize>,
    /// Producer of this mesh
    pub tag: MeshTag,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new(tag: MeshTag) -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            tag,
        }
    }

    /// Create a mesh with capacity for `vertex_count` vertices and
    /// `face_len` face buffer entries
    pub fn with_capacity(tag: MeshTag, vertex_count: usize, face_len: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count * 3),
            faces: Vec::with_capacity(face_len),
            tag,
        }
    }

    /// Add a vertex and return its index
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>) -> usize {
        let index = self.vertex_count();
        self.vertices.push(position.x);
        self.vertices.push(position.y);
        self.vertices.push(position.z);
        index
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: usize, i1: usize, i2: usize) {
        self.faces.extend_from_slice(&[3, i0, i1, i2]);
    }

    /// Add a quad
    #[inline]
    pub fn add_quad(&mut self, i0: usize, i1: usize, i2: usize, i3: usize) {
        self.faces.extend_from_slice(&[4, i0, i1, i2, i3]);
    }

    /// Add an n-gon face
    pub fn add_face(&mut self, indices: &[usize]) {
        if indices.len() < 3 {
            return;
        }
        self.faces.push(indices.len());
        self.faces.extend_from_slice(indices);
    }

    /// Get a vertex position
    pub fn vertex(&self, index: usize) -> Option<Point3<f64>> {
        let base = index * 3;
        let chunk = self.vertices.get(base..base + 3)?;
        Some(Point3::new(chunk[0], chunk[1], chunk[2]))
    }

    /// Iterate over faces as index slices
    pub fn faces(&self) -> Faces<'_> {
        Faces {
            buffer: &self.faces,
            cursor: 0,
        }
    }

    /// Merge another mesh into this one, keeping this mesh's tag
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }
        let offset = self.vertex_count();
        self.vertices.extend_from_slice(&other.vertices);
        for face in other.faces() {
            self.faces.push(face.len());
            self.faces.extend(face.iter().map(|&i| i + offset));
        }
    }

    /// Copy of this mesh moved by `offset`
    pub fn translated(&self, offset: Vector3<f64>, tag: MeshTag) -> Mesh {
        let mut vertices = self.vertices.clone();
        for chunk in vertices.chunks_exact_mut(3) {
            chunk[0] += offset.x;
            chunk[1] += offset.y;
            chunk[2] += offset.z;
        }
        Mesh {
            vertices,
            faces: self.faces.clone(),
            tag,
        }
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Get face count
    pub fn face_count(&self) -> usize {
        self.faces().count()
    }

    /// Number of triangles the faces would fan into
    pub fn triangle_count(&self) -> usize {
        self.faces().map(|f| f.len().saturating_sub(2)).sum()
    }

    /// Check if mesh has no faces
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Calculate bounds (min, max)
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        if self.vertices.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f64::MAX, f64::MAX, f64::MAX);
        let mut max = Point3::new(f64::MIN, f64::MIN, f64::MIN);

        for chunk in self.vertices.chunks_exact(3) {
            min.x = min.x.min(chunk[0]);
            min.y = min.y.min(chunk[1]);
            min.z = min.z.min(chunk[2]);
            max.x = max.x.max(chunk[0]);
            max.y = max.y.max(chunk[1]);
            max.z = max.z.max(chunk[2]);
        }

        (min, max)
    }
}

/// Iterator over the faces of a [`Mesh`]
pub struct Faces<'a> {
    buffer: &'a [usize],
    cursor: usize,
}

impl<'a> Iterator for Faces<'a> {
    type Item = &'a [usize];

    fn next(&mut self) -> Option<Self::Item> {
        let prefix = *self.buffer.get(self.cursor)?;
        let arity = match prefix {
            0 => 3,
            1 => 4,
            n => n,
        };
        let start = self.cursor + 1;
        let end = start + arity;
        if end > self.buffer.len() {
            self.cursor = self.buffer.len();
            return None;
        }
        self.cursor = end;
        Some(&self.buffer[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_quad() -> Mesh {
        let mut mesh = Mesh::new(MeshTag::SurfacePolygon);
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(1.0, 1.0, 0.0));
        mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        mesh.add_quad(0, 1, 2, 3);
        mesh
    }

    #[test]
    fn test_mixed_arity_faces() {
        let mut mesh = unit_quad();
        mesh.add_triangle(0, 1, 2);
        mesh.add_face(&[0, 1, 2, 3, 0]);

        let arities: Vec<usize> = mesh.faces().map(|f| f.len()).collect();
        assert_eq!(arities, vec![4, 3, 5]);
        assert_eq!(mesh.triangle_count(), 2 + 1 + 3);
    }

    #[test]
    fn test_legacy_prefixes() {
        let mesh = Mesh {
            vertices: vec![0.0; 12],
            faces: vec![0, 0, 1, 2, 1, 0, 1, 2, 3],
            tag: MeshTag::SurfacePolygon,
        };
        let faces: Vec<&[usize]> = mesh.faces().collect();
        assert_eq!(faces, vec![&[0, 1, 2][..], &[0, 1, 2, 3][..]]);
    }

    #[test]
    fn test_truncated_face_buffer_stops() {
        let mesh = Mesh {
            vertices: vec![0.0; 9],
            faces: vec![3, 0, 1, 2, 4, 0, 1],
            tag: MeshTag::SurfacePolygon,
        };
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut mesh = unit_quad();
        let other = unit_quad();
        mesh.merge(&other);

        assert_eq!(mesh.vertex_count(), 8);
        let last: Vec<usize> = mesh.faces().last().map(|f| f.to_vec()).unwrap_or_default();
        assert_eq!(last, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_translated_keeps_faces() {
        let mesh = unit_quad();
        let moved = mesh.translated(Vector3::new(0.0, 0.0, -0.2), MeshTag::TranslatedCopy);

        assert_eq!(moved.faces, mesh.faces);
        assert_eq!(moved.tag, MeshTag::TranslatedCopy);
        let (min, max) = moved.bounds();
        assert!((min.z + 0.2).abs() < 1e-12);
        assert!((max.z + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_fallback_tags() {
        assert!(MeshTag::WrappedFallback.is_fallback());
        assert!(!MeshTag::SurfaceExtrusion.is_fallback());
        assert_eq!(MeshTag::LinearExtrusion.as_str(), "extrusion_dynamic");
    }
}
