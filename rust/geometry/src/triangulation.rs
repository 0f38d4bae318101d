// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation with interior holes
//!
//! Rings are laid out back to back in one caller-owned buffer: the outer
//! ring first, then each hole. Returned indices point into that buffer,
//! shifted by the caller's offset.
//!
//! Holes are spliced into the outer boundary through a bridge edge to a
//! mutually visible vertex, then the single resulting boundary is ear
//! clipped. When clipping fails the outer ring is fanned from its first
//! vertex and the holes are ignored.

use crate::{Error, Point2, Point3, Result, Vector3};

/// Distance under which a ring's last point closes onto its first
const CLOSURE_TOLERANCE: f64 = 1e-6;
/// Twice-area below which a ring or corner counts as degenerate
const AREA_EPSILON: f64 = 1e-12;

#[inline]
fn orient(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn signed_area(points: &[Point2<f64>], ring: &[usize]) -> f64 {
    let n = ring.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = &points[ring[i]];
        let b = &points[ring[(i + 1) % n]];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// Buffer indices of a ring, without a closing duplicate of its first point
fn ring_indices(ring: &[Point2<f64>], start: usize) -> Vec<usize> {
    let mut len = ring.len();
    if len > 1 && (ring[0] - ring[len - 1]).norm() < CLOSURE_TOLERANCE {
        len -= 1;
    }
    (start..start + len).collect()
}

/// Triangulate an outer ring with optional holes.
///
/// `rings[0]` is the outer boundary, the rest are holes. Never fails: a
/// ring that cannot be ear clipped is fanned from its first vertex. Returns
/// an empty list only when the outer ring has fewer than three points.
pub fn triangulate_rings(rings: &[Vec<Point2<f64>>], offset: usize) -> Vec<[usize; 3]> {
    let Some(outer) = rings.first() else {
        return Vec::new();
    };
    let outer_len = ring_indices(outer, 0).len();
    if outer_len < 3 {
        return Vec::new();
    }

    match ear_clip_rings(rings, offset) {
        Ok(triangles) => triangles,
        Err(e) => {
            tracing::debug!(
                error = %e,
                vertices = outer_len,
                holes = rings.len() - 1,
                "Ear clipping failed, falling back to fan"
            );
            fan_triangulate(outer_len, offset)
        }
    }
}

/// Ear clip an outer ring with holes, reporting failure instead of
/// degrading.
pub fn ear_clip_rings(rings: &[Vec<Point2<f64>>], offset: usize) -> Result<Vec<[usize; 3]>> {
    let points: Vec<Point2<f64>> = rings.iter().flatten().copied().collect();

    let mut outer = rings
        .first()
        .map(|ring| ring_indices(ring, 0))
        .unwrap_or_default();
    if outer.len() < 3 {
        return Err(Error::InvalidRing(format!(
            "outer ring has {} points, need at least 3",
            outer.len()
        )));
    }

    let area = signed_area(&points, &outer);
    if area.abs() < AREA_EPSILON {
        return Err(Error::TriangulationError(
            "outer ring has zero area".to_string(),
        ));
    }
    if area < 0.0 {
        outer.reverse();
    }

    let mut holes = Vec::with_capacity(rings.len().saturating_sub(1));
    let mut start = rings[0].len();
    for ring in &rings[1..] {
        let mut hole = ring_indices(ring, start);
        start += ring.len();

        if hole.len() < 3 {
            continue;
        }
        let area = signed_area(&points, &hole);
        if area.abs() < AREA_EPSILON {
            tracing::debug!(vertices = hole.len(), "Skipping zero-area hole");
            continue;
        }
        // Holes wind against the outer ring
        if area > 0.0 {
            hole.reverse();
        }
        holes.push(hole);
    }

    let boundary = bridge_holes(&points, outer, holes)?;
    let triangles = clip_ears(&points, boundary)?;

    Ok(triangles
        .into_iter()
        .map(|[a, b, c]| [a + offset, b + offset, c + offset])
        .collect())
}

/// Fan over `n` consecutive buffer indices starting at `offset`
pub fn fan_triangulate(n: usize, offset: usize) -> Vec<[usize; 3]> {
    if n < 3 {
        return Vec::new();
    }
    (1..n - 1)
        .map(|i| [offset, offset + i, offset + i + 1])
        .collect()
}

/// Position of the rightmost vertex of a ring (lowest y on ties)
fn rightmost(points: &[Point2<f64>], ring: &[usize]) -> usize {
    let mut best = 0;
    for (pos, &index) in ring.iter().enumerate().skip(1) {
        let p = &points[index];
        let b = &points[ring[best]];
        if p.x > b.x || (p.x == b.x && p.y < b.y) {
            best = pos;
        }
    }
    best
}

fn bridge_holes(
    points: &[Point2<f64>],
    mut boundary: Vec<usize>,
    mut holes: Vec<Vec<usize>>,
) -> Result<Vec<usize>> {
    holes.sort_by(|a, b| {
        let ax = points[a[rightmost(points, a)]].x;
        let bx = points[b[rightmost(points, b)]].x;
        bx.total_cmp(&ax)
    });

    for (h, hole) in holes.iter().enumerate() {
        let m_pos = rightmost(points, hole);
        let m = hole[m_pos];

        let bridge = find_bridge(points, &boundary, m, &holes[h..]).ok_or_else(|| {
            Error::TriangulationError("no visible bridge vertex for hole".to_string())
        })?;

        let mut spliced = Vec::with_capacity(boundary.len() + hole.len() + 2);
        spliced.extend_from_slice(&boundary[..=bridge]);
        spliced.extend(hole[m_pos..].iter().chain(&hole[..m_pos]).copied());
        spliced.push(m);
        spliced.push(boundary[bridge]);
        spliced.extend_from_slice(&boundary[bridge + 1..]);
        boundary = spliced;
    }

    Ok(boundary)
}

/// Nearest boundary position that `m` can see without crossing an edge
fn find_bridge(
    points: &[Point2<f64>],
    boundary: &[usize],
    m: usize,
    pending_holes: &[Vec<usize>],
) -> Option<usize> {
    let target = points[m];
    let n = boundary.len();

    let mut candidates: Vec<usize> = (0..n).collect();
    candidates.sort_by(|&a, &b| {
        let da = (points[boundary[a]] - target).norm_squared();
        let db = (points[boundary[b]] - target).norm_squared();
        da.total_cmp(&db)
    });

    candidates.into_iter().find(|&pos| {
        let p = boundary[pos];
        let prev = boundary[(pos + n - 1) % n];
        let next = boundary[(pos + 1) % n];

        locally_inside(&points[prev], &points[p], &points[next], &target)
            && !crosses_ring(points, boundary, p, m)
            && pending_holes
                .iter()
                .all(|hole| !crosses_ring(points, hole, p, m))
    })
}

/// Whether the direction from `p` towards `target` enters the interior
/// cone at `p` of a counter-clockwise ring
#[inline]
fn locally_inside(
    prev: &Point2<f64>,
    p: &Point2<f64>,
    next: &Point2<f64>,
    target: &Point2<f64>,
) -> bool {
    if orient(prev, p, next) > 0.0 {
        orient(prev, p, target) > 0.0 && orient(p, next, target) > 0.0
    } else {
        orient(prev, p, target) > 0.0 || orient(p, next, target) > 0.0
    }
}

fn crosses_ring(points: &[Point2<f64>], ring: &[usize], p: usize, m: usize) -> bool {
    let n = ring.len();
    (0..n).any(|i| {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        if a == p || b == p || a == m || b == m {
            return false;
        }
        segments_cross(&points[p], &points[m], &points[a], &points[b])
    })
}

#[inline]
fn segments_cross(p1: &Point2<f64>, p2: &Point2<f64>, q1: &Point2<f64>, q2: &Point2<f64>) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

#[inline]
fn corner(ring: &[usize], i: usize) -> (usize, usize, usize) {
    let n = ring.len();
    (ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n])
}

fn clip_ears(points: &[Point2<f64>], mut ring: Vec<usize>) -> Result<Vec<[usize; 3]>> {
    let mut triangles = Vec::with_capacity(ring.len().saturating_sub(2));

    while ring.len() > 3 {
        let n = ring.len();

        // Restart the scan from the first vertex after every clip
        if let Some(i) = (0..n).find(|&i| is_ear(points, &ring, i)) {
            let (a, b, c) = corner(&ring, i);
            triangles.push([a, b, c]);
            ring.remove(i);
            continue;
        }

        // Collinear vertices are never ears; drop one and rescan
        let flat = (0..n).find(|&i| {
            let (a, b, c) = corner(&ring, i);
            orient(&points[a], &points[b], &points[c]).abs() <= AREA_EPSILON
        });
        match flat {
            Some(i) => {
                ring.remove(i);
            }
            None => {
                return Err(Error::TriangulationError(format!(
                    "no ear found with {} vertices remaining",
                    n
                )));
            }
        }
    }

    if ring.len() == 3 {
        let (a, b, c) = (ring[0], ring[1], ring[2]);
        if orient(&points[a], &points[b], &points[c]).abs() > AREA_EPSILON {
            triangles.push([a, b, c]);
        }
    }

    if triangles.is_empty() {
        return Err(Error::TriangulationError(
            "ring collapsed without producing a triangle".to_string(),
        ));
    }
    Ok(triangles)
}

fn is_ear(points: &[Point2<f64>], ring: &[usize], i: usize) -> bool {
    let (a, b, c) = corner(ring, i);
    let (pa, pb, pc) = (&points[a], &points[b], &points[c]);

    if orient(pa, pb, pc) <= AREA_EPSILON {
        return false;
    }

    ring.iter()
        .all(|&v| v == a || v == b || v == c || !strictly_inside(pa, pb, pc, &points[v]))
}

/// Barycentric containment, excluding the triangle's edges and corners
#[inline]
fn strictly_inside(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>, p: &Point2<f64>) -> bool {
    const EPS: f64 = 1e-12;

    let v0 = c - a;
    let v1 = b - a;
    let v2 = p - a;

    let dot00 = v0.dot(&v0);
    let dot01 = v0.dot(&v1);
    let dot02 = v0.dot(&v2);
    let dot11 = v1.dot(&v1);
    let dot12 = v1.dot(&v2);

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < f64::EPSILON {
        return false;
    }
    let inv = 1.0 / denom;
    let s = (dot11 * dot02 - dot01 * dot12) * inv;
    let t = (dot00 * dot12 - dot01 * dot02) * inv;

    s > EPS && t > EPS && 1.0 - s - t > EPS
}

/// Project 3D points onto the plane through the first point with the given
/// normal. Returns the 2D points and the basis (u_axis, v_axis, origin).
///
/// The basis satisfies `u_axis × v_axis = normal`, so counter-clockwise in
/// 2D is counter-clockwise seen from the normal's side.
pub fn project_to_2d(
    points_3d: &[Point3<f64>],
    normal: &Vector3<f64>,
) -> (Vec<Point2<f64>>, Vector3<f64>, Vector3<f64>, Point3<f64>) {
    if points_3d.is_empty() {
        return (
            Vec::new(),
            Vector3::zeros(),
            Vector3::zeros(),
            Point3::origin(),
        );
    }

    let origin = points_3d[0];

    // Reference axis least parallel to the normal
    let abs_x = normal.x.abs();
    let abs_y = normal.y.abs();
    let abs_z = normal.z.abs();
    let reference = if abs_x <= abs_y && abs_x <= abs_z {
        Vector3::x()
    } else if abs_y <= abs_z {
        Vector3::y()
    } else {
        Vector3::z()
    };

    let u_axis = normal.cross(&reference).normalize();
    let v_axis = normal.cross(&u_axis).normalize();

    let points_2d = project_to_2d_with_basis(points_3d, &u_axis, &v_axis, &origin);
    (points_2d, u_axis, v_axis, origin)
}

/// Project 3D points with an existing basis so several rings share one 2D
/// space
#[inline]
pub fn project_to_2d_with_basis(
    points_3d: &[Point3<f64>],
    u_axis: &Vector3<f64>,
    v_axis: &Vector3<f64>,
    origin: &Point3<f64>,
) -> Vec<Point2<f64>> {
    points_3d
        .iter()
        .map(|p| {
            let v = p - origin;
            Point2::new(v.dot(u_axis), v.dot(v_axis))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ring(coords: &[(f64, f64)]) -> Vec<Point2<f64>> {
        coords.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    fn total_area(rings: &[Vec<Point2<f64>>], triangles: &[[usize; 3]]) -> f64 {
        let points: Vec<Point2<f64>> = rings.iter().flatten().copied().collect();
        triangles
            .iter()
            .map(|&[a, b, c]| orient(&points[a], &points[b], &points[c]).abs() / 2.0)
            .sum()
    }

    #[test]
    fn test_rectangle_two_triangles() {
        let rings = vec![ring(&[(0.0, 0.0), (4.0, 0.0), (4.0, 2.0), (0.0, 2.0)])];
        let triangles = triangulate_rings(&rings, 0);

        assert_eq!(triangles.len(), 2);
        assert_relative_eq!(total_area(&rings, &triangles), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_closing_duplicate_is_ignored() {
        let rings = vec![ring(&[
            (0.0, 0.0),
            (4.0, 0.0),
            (4.0, 2.0),
            (0.0, 2.0),
            (0.0, 0.0),
        ])];
        let triangles = triangulate_rings(&rings, 0);

        assert_eq!(triangles.len(), 2);
        assert!(triangles.iter().flatten().all(|&i| i < 4));
    }

    #[test]
    fn test_clockwise_outer_ring() {
        let rings = vec![ring(&[(0.0, 0.0), (0.0, 3.0), (3.0, 3.0), (3.0, 0.0)])];
        let triangles = ear_clip_rings(&rings, 0).expect("clockwise ring clips");

        assert_eq!(triangles.len(), 2);
        assert_relative_eq!(total_area(&rings, &triangles), 9.0, epsilon = 1e-9);
    }

    #[test]
    fn test_concave_l_shape() {
        let rings = vec![ring(&[
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (0.0, 2.0),
        ])];
        let triangles = ear_clip_rings(&rings, 0).expect("L shape clips");

        assert_eq!(triangles.len(), 4);
        assert_relative_eq!(total_area(&rings, &triangles), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_collinear_edge_vertex_is_dropped() {
        // (2,0) sits on the bottom edge
        let rings = vec![ring(&[(0.0, 0.0), (2.0, 0.0), (4.0, 0.0), (4.0, 2.0), (0.0, 2.0)])];
        let triangles = ear_clip_rings(&rings, 0).expect("clips");

        assert_relative_eq!(total_area(&rings, &triangles), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_square_with_square_hole() {
        let rings = vec![
            ring(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]),
            ring(&[(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]),
        ];
        let triangles = ear_clip_rings(&rings, 0).expect("square with hole clips");

        assert_eq!(triangles.len(), 8);
        assert_relative_eq!(total_area(&rings, &triangles), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_triangle_with_triangular_hole() {
        let rings = vec![
            ring(&[(0.0, 0.0), (10.0, 0.0), (5.0, 10.0)]),
            ring(&[(4.0, 3.0), (6.0, 3.0), (5.0, 5.0)]),
        ];
        let triangles = triangulate_rings(&rings, 0);
        assert!(!triangles.is_empty());
        assert!(triangles.iter().flatten().all(|&i| i < 6));
        assert_relative_eq!(total_area(&rings, &triangles), 48.0, epsilon = 1e-9);

        // No triangle covers the hole's centroid
        let points: Vec<Point2<f64>> = rings.iter().flatten().copied().collect();
        let centroid = Point2::new(5.0, 11.0 / 3.0);
        for &[a, b, c] in &triangles {
            assert!(!strictly_inside(&points[a], &points[b], &points[c], &centroid));
        }
    }

    #[test]
    fn test_offset_shifts_indices() {
        let rings = vec![ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)])];
        let triangles = triangulate_rings(&rings, 7);

        assert_eq!(triangles.len(), 1);
        let mut sorted = triangles[0];
        sorted.sort_unstable();
        assert_eq!(sorted, [7, 8, 9]);
    }

    #[test]
    fn test_degenerate_outer_reports_error() {
        let rings = vec![ring(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])];
        assert!(matches!(
            ear_clip_rings(&rings, 0),
            Err(Error::TriangulationError(_))
        ));
    }

    #[test]
    fn test_failure_falls_back_to_outer_fan() {
        // Collinear outer ring cannot be clipped; the hole must be ignored
        let rings = vec![
            ring(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]),
            ring(&[(0.2, 0.1), (0.4, 0.1), (0.3, 0.2)]),
        ];
        let triangles = triangulate_rings(&rings, 10);

        assert_eq!(triangles, vec![[10, 11, 12]]);
        assert!(triangles.iter().flatten().all(|&i| (10..13).contains(&i)));
    }

    #[test]
    fn test_too_few_points() {
        let rings = vec![ring(&[(0.0, 0.0), (1.0, 0.0)])];
        assert!(triangulate_rings(&rings, 0).is_empty());
        assert!(triangulate_rings(&[], 0).is_empty());
        assert!(matches!(
            ear_clip_rings(&rings, 0),
            Err(Error::InvalidRing(_))
        ));
    }

    #[test]
    fn test_fan() {
        assert_eq!(fan_triangulate(4, 2), vec![[2, 3, 4], [2, 4, 5]]);
        assert!(fan_triangulate(2, 0).is_empty());
    }

    #[test]
    fn test_projection_basis_is_right_handed() {
        let normal = Vector3::new(0.0, 0.0, 1.0);
        let points = vec![
            Point3::new(1.0, 1.0, 5.0),
            Point3::new(2.0, 1.0, 5.0),
            Point3::new(2.0, 2.0, 5.0),
        ];
        let (projected, u, v, origin) = project_to_2d(&points, &normal);

        assert_relative_eq!((u.cross(&v) - normal).norm(), 0.0, epsilon = 1e-12);
        assert_eq!(origin, points[0]);
        assert_eq!(projected[0], Point2::new(0.0, 0.0));
        let ccw = orient(&projected[0], &projected[1], &projected[2]);
        assert!(ccw > 0.0);
    }
}
