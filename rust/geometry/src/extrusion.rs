// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion operations - display solids for surface and linear members

use crate::error::{Error, Result};
use crate::mesh::{Mesh, MeshTag};
use crate::profile::{RectangularSection, VerticalAlignment};
use crate::triangulation::{
    fan_triangulate, project_to_2d, project_to_2d_with_basis, triangulate_rings,
};
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

/// Normal magnitude under which a surface has no usable plane
const NORMAL_TOLERANCE: f64 = 1e-6;
/// Distance under which a ring's last point closes onto its first
const CLOSURE_TOLERANCE: f64 = 1e-6;
/// Horizontal direction component under which a line counts as vertical
const VERTICAL_LINE_TOLERANCE: f64 = 1e-3;
/// Cross product norm under which the right vector is replaced
const RIGHT_VECTOR_TOLERANCE: f64 = 1e-4;
/// Centerline length under which a linear member has no extent
const CENTERLINE_TOLERANCE: f64 = 1e-9;

/// Drop a closing duplicate of the first point
fn open_ring(ring: &[Point3<f64>]) -> &[Point3<f64>] {
    match ring {
        [first, .., last] if ring.len() > 1 && (first - last).norm() < CLOSURE_TOLERANCE => {
            &ring[..ring.len() - 1]
        }
        _ => ring,
    }
}

/// Unit normal from the first two edges of a ring
fn ring_normal(ring: &[Point3<f64>]) -> Option<Vector3<f64>> {
    if ring.len() < 3 {
        return None;
    }
    let normal = (ring[1] - ring[0]).cross(&(ring[2] - ring[0]));
    let magnitude = normal.norm();
    if magnitude < NORMAL_TOLERANCE {
        return None;
    }
    Some(normal / magnitude)
}

/// Extrude a surface outline with optional holes by `thickness`.
///
/// `rings[0]` is the outer ring, the rest are holes. The top face sits on
/// the rings and the bottom face is offset by `-normal * thickness`.
/// Surfaces whose normal has a vertical component below
/// `vertical_threshold` are walls and get a plain fan over the outer ring.
///
/// Returns `None` when the outer ring has no usable plane. A surface whose
/// faces cannot be triangulated is returned wrapped, see [`extrude_wrapped`].
pub fn extrude_surface(
    rings: &[Vec<Point3<f64>>],
    thickness: f64,
    vertical_threshold: f64,
) -> Option<Mesh> {
    let rings: Vec<&[Point3<f64>]> = rings
        .iter()
        .map(|ring| open_ring(ring))
        .enumerate()
        .filter(|(i, ring)| *i == 0 || ring.len() >= 3)
        .map(|(_, ring)| ring)
        .collect();

    let outer = *rings.first()?;
    let normal = ring_normal(outer)?;
    let offset = normal * thickness;
    let is_vertical = normal.z.abs() < vertical_threshold;

    let triangles = if is_vertical {
        fan_triangulate(outer.len(), 0)
    } else {
        let (outer_2d, u_axis, v_axis, origin) = project_to_2d(outer, &normal);
        let mut rings_2d = Vec::with_capacity(rings.len());
        rings_2d.push(outer_2d);
        for hole in &rings[1..] {
            rings_2d.push(project_to_2d_with_basis(hole, &u_axis, &v_axis, &origin));
        }
        triangulate_rings(&rings_2d, 0)
    };

    if triangles.is_empty() {
        tracing::debug!(
            rings = rings.len(),
            vertical = is_vertical,
            "Surface produced no triangles, wrapping rings"
        );
        return Some(wrap_rings(&rings, offset));
    }

    let total: usize = rings.iter().map(|ring| ring.len()).sum();
    let mut mesh = Mesh::with_capacity(
        MeshTag::SurfaceExtrusion,
        total * 2,
        triangles.len() * 8 + total * 5,
    );

    let mut starts: SmallVec<[usize; 4]> = SmallVec::with_capacity(rings.len());
    for ring in &rings {
        starts.push(mesh.vertex_count());
        for p in ring.iter() {
            mesh.add_vertex(*p);
        }
    }
    for ring in &rings {
        for p in ring.iter() {
            mesh.add_vertex(p - offset);
        }
    }

    for &[a, b, c] in &triangles {
        mesh.add_triangle(a, b, c);
        // Bottom faces the other way
        mesh.add_triangle(a + total, c + total, b + total);
    }

    for (ring, &start) in rings.iter().zip(&starts) {
        add_side_quads(&mut mesh, start, ring.len(), total);
    }

    Some(mesh)
}

/// Extrude every ring on its own, ignoring holes, and tag the result as a
/// fallback. Each ring becomes a closed prism with its own caps.
pub fn extrude_wrapped(rings: &[Vec<Point3<f64>>], offset: Vector3<f64>) -> Mesh {
    let rings: Vec<&[Point3<f64>]> = rings.iter().map(|ring| open_ring(ring)).collect();
    wrap_rings(&rings, offset)
}

fn wrap_rings(rings: &[&[Point3<f64>]], offset: Vector3<f64>) -> Mesh {
    let mut mesh = Mesh::new(MeshTag::WrappedFallback);

    for ring in rings.iter().filter(|ring| ring.len() >= 3) {
        let n = ring.len();
        let top = mesh.vertex_count();
        for p in ring.iter() {
            mesh.add_vertex(*p);
        }
        for p in ring.iter() {
            mesh.add_vertex(p - offset);
        }

        let triangles = match ring_normal(ring) {
            Some(normal) => {
                let (ring_2d, ..) = project_to_2d(ring, &normal);
                triangulate_rings(&[ring_2d], top)
            }
            None => fan_triangulate(n, top),
        };
        for [a, b, c] in triangles {
            mesh.add_triangle(a, b, c);
            mesh.add_triangle(a + n, c + n, b + n);
        }

        add_side_quads(&mut mesh, top, n, n);
    }

    mesh
}

/// Quads joining ring edge `i -> j` on top with its copy `bottom_shift`
/// vertices later
fn add_side_quads(mesh: &mut Mesh, start: usize, len: usize, bottom_shift: usize) {
    for i in 0..len {
        let j = (i + 1) % len;
        let top_i = start + i;
        let top_j = start + j;
        mesh.add_quad(top_i, top_j, top_j + bottom_shift, top_i + bottom_shift);
    }
}

/// Sweep a rectangular section along a centerline into an eight-vertex,
/// six-quad box.
///
/// The local frame uses `right = direction × Z` and `up = right × direction`.
/// Near-vertical lines use world X as right. The alignment shifts the
/// section along `up`.
pub fn extrude_centerline(
    start: Point3<f64>,
    end: Point3<f64>,
    section: &RectangularSection,
    alignment: VerticalAlignment,
) -> Result<Mesh> {
    let axis = end - start;
    let length = axis.norm();
    if length < CENTERLINE_TOLERANCE {
        return Err(Error::DegenerateCenterline { length });
    }
    let direction = axis / length;

    let right = if direction.x.abs() < VERTICAL_LINE_TOLERANCE
        && direction.y.abs() < VERTICAL_LINE_TOLERANCE
    {
        Vector3::x()
    } else {
        direction
            .cross(&Vector3::z())
            .try_normalize(RIGHT_VECTOR_TOLERANCE)
            .unwrap_or_else(Vector3::x)
    };
    let up = right
        .cross(&direction)
        .try_normalize(RIGHT_VECTOR_TOLERANCE)
        .ok_or(Error::DegenerateCenterline { length })?;

    let half_width = section.width / 2.0;
    let half_depth = section.depth / 2.0;
    let shift = alignment.offset(section.depth);

    let corners = [
        (-half_width, -half_depth),
        (half_width, -half_depth),
        (half_width, half_depth),
        (-half_width, half_depth),
    ];

    let mut mesh = Mesh::with_capacity(MeshTag::LinearExtrusion, 8, 30);
    for base in [start, end] {
        for &(x, y) in &corners {
            mesh.add_vertex(base + right * x + up * (y + shift));
        }
    }

    mesh.add_quad(0, 1, 2, 3);
    mesh.add_quad(4, 5, 6, 7);
    mesh.add_quad(0, 1, 5, 4);
    mesh.add_quad(1, 2, 6, 5);
    mesh.add_quad(2, 3, 7, 6);
    mesh.add_quad(3, 0, 4, 7);

    Ok(mesh)
}

/// Single n-gon face over an outline
pub fn polygon_mesh(ring: &[Point3<f64>]) -> Mesh {
    let ring = open_ring(ring);
    let mut mesh = Mesh::with_capacity(MeshTag::SurfacePolygon, ring.len(), ring.len() + 1);
    let indices: Vec<usize> = ring.iter().map(|p| mesh.add_vertex(*p)).collect();
    mesh.add_face(&indices);
    mesh
}

/// Flat triangle fan marking an opening
pub fn opening_mesh(ring: &[Point3<f64>]) -> Mesh {
    let ring = open_ring(ring);
    let mut mesh = Mesh::with_capacity(MeshTag::OpeningIndicator, ring.len(), ring.len() * 4);
    for p in ring {
        mesh.add_vertex(*p);
    }
    for [a, b, c] in fan_triangulate(ring.len(), 0) {
        mesh.add_triangle(a, b, c);
    }
    mesh
}

/// Copy of a mesh moved down by `thickness` along world Z
pub fn translate_mesh(mesh: &Mesh, thickness: f64) -> Mesh {
    mesh.translated(Vector3::new(0.0, 0.0, -thickness), MeshTag::TranslatedCopy)
}

/// Stitch two polygons with the same vertex order into a closed shell.
///
/// Both meshes must list their outline vertices in ring order. Returns
/// `None` when the vertex counts differ or there is no ring to stitch.
pub fn connect_top_and_bottom(top: &Mesh, bottom: &Mesh) -> Option<Mesh> {
    let n = top.vertex_count();
    if n < 3 || bottom.vertex_count() != n {
        return None;
    }

    let mut mesh = Mesh::with_capacity(MeshTag::SideConnected, n * 2, top.faces.len() * 2 + n * 5);
    mesh.vertices.extend_from_slice(&top.vertices);
    mesh.vertices.extend_from_slice(&bottom.vertices);
    for face in top.faces() {
        mesh.add_face(face);
    }
    for face in bottom.faces() {
        let reversed: Vec<usize> = face.iter().rev().map(|&i| i + n).collect();
        mesh.add_face(&reversed);
    }
    add_side_quads(&mut mesh, 0, n, n);

    Some(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pts(coords: &[(f64, f64, f64)]) -> Vec<Point3<f64>> {
        coords
            .iter()
            .map(|&(x, y, z)| Point3::new(x, y, z))
            .collect()
    }

    #[test]
    fn test_horizontal_slab() {
        let ring = pts(&[
            (0.0, 0.0, 3.0),
            (4.0, 0.0, 3.0),
            (4.0, 2.0, 3.0),
            (0.0, 2.0, 3.0),
        ]);
        let mesh = extrude_surface(&[ring], 0.2, 0.3).expect("slab extrudes");

        assert_eq!(mesh.tag, MeshTag::SurfaceExtrusion);
        assert_eq!(mesh.vertex_count(), 8);
        // 2 top + 2 bottom triangles + 4 side quads
        assert_eq!(mesh.face_count(), 8);

        let (min, max) = mesh.bounds();
        assert_relative_eq!(max.z, 3.0, epsilon = 1e-12);
        assert_relative_eq!(min.z, 2.8, epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_wall_bottom_is_offset_by_normal() {
        // Wall in the XZ plane, normal along -Y
        let ring = pts(&[
            (0.0, 0.0, 0.0),
            (5.0, 0.0, 0.0),
            (5.0, 0.0, 3.0),
            (0.0, 0.0, 3.0),
        ]);
        let thickness = 0.25;
        let mesh = extrude_surface(&[ring.clone()], thickness, 0.3).expect("wall extrudes");
        let normal = ring_normal(&ring).expect("wall has a normal");
        assert!(normal.z.abs() < 1e-12);

        for (i, top) in ring.iter().enumerate() {
            let bottom = mesh.vertex(i + ring.len()).expect("bottom vertex");
            let expected = top - normal * thickness;
            assert_relative_eq!((bottom - expected).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_slab_with_opening() {
        let outer = pts(&[
            (0.0, 0.0, 0.0),
            (4.0, 0.0, 0.0),
            (4.0, 4.0, 0.0),
            (0.0, 4.0, 0.0),
        ]);
        let hole = pts(&[
            (1.0, 1.0, 0.0),
            (3.0, 1.0, 0.0),
            (3.0, 3.0, 0.0),
            (1.0, 3.0, 0.0),
        ]);
        let mesh = extrude_surface(&[outer, hole], 0.3, 0.3).expect("slab extrudes");

        assert_eq!(mesh.vertex_count(), 16);
        // 8 top + 8 bottom triangles + 4 outer + 4 hole side quads
        assert_eq!(mesh.face_count(), 24);
    }

    #[test]
    fn test_closing_point_is_dropped() {
        let ring = pts(&[
            (0.0, 0.0, 0.0),
            (1.0, 0.0, 0.0),
            (1.0, 1.0, 0.0),
            (0.0, 0.0, 0.0),
        ]);
        let mesh = extrude_surface(&[ring], 0.1, 0.3).expect("triangle extrudes");
        assert_eq!(mesh.vertex_count(), 6);
    }

    #[test]
    fn test_degenerate_normal_yields_none() {
        let ring = pts(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (2.0, 0.0, 0.0)]);
        assert!(extrude_surface(&[ring], 0.1, 0.3).is_none());
        assert!(extrude_surface(&[], 0.1, 0.3).is_none());
    }

    #[test]
    fn test_wrapped_fallback_is_closed_per_ring() {
        let outer = pts(&[
            (0.0, 0.0, 0.0),
            (4.0, 0.0, 0.0),
            (4.0, 4.0, 0.0),
            (0.0, 4.0, 0.0),
        ]);
        let hole = pts(&[(1.0, 1.0, 0.0), (2.0, 1.0, 0.0), (2.0, 2.0, 0.0)]);
        let mesh = extrude_wrapped(&[outer, hole], Vector3::new(0.0, 0.0, 0.5));

        assert!(mesh.tag.is_fallback());
        assert_eq!(mesh.vertex_count(), 14);
        // outer: 2+2 caps + 4 sides, hole: 1+1 caps + 3 sides
        assert_eq!(mesh.face_count(), 8 + 5);
        let (min, _) = mesh.bounds();
        assert_relative_eq!(min.z, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_horizontal_beam_box() {
        let section = RectangularSection::new(0.3, 0.6);
        let mesh = extrude_centerline(
            Point3::new(0.0, 0.0, 3.0),
            Point3::new(6.0, 0.0, 3.0),
            &section,
            VerticalAlignment::Middle,
        )
        .expect("beam extrudes");

        assert_eq!(mesh.tag, MeshTag::LinearExtrusion);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 6);
        assert!(mesh.faces().all(|f| f.len() == 4));

        let (min, max) = mesh.bounds();
        assert_relative_eq!(min.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(max.x, 6.0, epsilon = 1e-12);
        assert_relative_eq!(max.y - min.y, 0.3, epsilon = 1e-12);
        assert_relative_eq!(min.z, 2.7, epsilon = 1e-12);
        assert_relative_eq!(max.z, 3.3, epsilon = 1e-12);
    }

    #[test]
    fn test_top_aligned_beam_hangs_below() {
        let section = RectangularSection::new(0.3, 0.6);
        let mesh = extrude_centerline(
            Point3::new(0.0, 0.0, 3.0),
            Point3::new(0.0, 6.0, 3.0),
            &section,
            VerticalAlignment::Top,
        )
        .expect("beam extrudes");

        let (min, max) = mesh.bounds();
        assert_relative_eq!(max.z, 3.0, epsilon = 1e-12);
        assert_relative_eq!(min.z, 2.4, epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_column_uses_world_x() {
        let mesh = extrude_centerline(
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 4.0),
            &RectangularSection::default(),
            VerticalAlignment::Middle,
        )
        .expect("column extrudes");

        let (min, max) = mesh.bounds();
        assert_relative_eq!(min.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(max.x, 1.5, epsilon = 1e-12);
        assert_relative_eq!(min.z, 0.0, epsilon = 1e-12);
        assert_relative_eq!(max.z, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_length_centerline() {
        let p = Point3::new(2.0, 2.0, 2.0);
        let result = extrude_centerline(
            p,
            p,
            &RectangularSection::default(),
            VerticalAlignment::Middle,
        );
        assert!(matches!(result, Err(Error::DegenerateCenterline { .. })));
    }

    #[test]
    fn test_translate_and_connect() {
        let ring = pts(&[
            (0.0, 0.0, 0.0),
            (2.0, 0.0, 0.0),
            (2.0, 2.0, 0.0),
            (0.0, 2.0, 0.0),
        ]);
        let top = polygon_mesh(&ring);
        let bottom = translate_mesh(&top, 0.2);
        assert_eq!(bottom.tag, MeshTag::TranslatedCopy);

        let shell = connect_top_and_bottom(&top, &bottom).expect("same vertex count");
        assert_eq!(shell.tag, MeshTag::SideConnected);
        assert_eq!(shell.vertex_count(), 8);
        assert_eq!(shell.face_count(), 2 + 4);

        let lonely = polygon_mesh(&ring[..3]);
        assert!(connect_top_and_bottom(&top, &lonely).is_none());
    }

    #[test]
    fn test_opening_mesh_is_flat_fan() {
        let ring = pts(&[
            (0.0, 0.0, 0.0),
            (1.0, 0.0, 0.0),
            (1.0, 1.0, 0.0),
            (0.0, 1.0, 0.0),
        ]);
        let mesh = opening_mesh(&ring);
        assert_eq!(mesh.tag, MeshTag::OpeningIndicator);
        assert_eq!(mesh.face_count(), 2);
    }
}
