// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Display meshes for slabs, walls and members as produced on send.

use approx::assert_relative_eq;
use structsync_geometry::{
    extrude_centerline, extrude_surface, triangulate_rings, MeshTag, Point2, Point3,
    RectangularSection, VerticalAlignment,
};

fn square(x: f64, y: f64, size: f64) -> Vec<Point2<f64>> {
    vec![
        Point2::new(x, y),
        Point2::new(x + size, y),
        Point2::new(x + size, y + size),
        Point2::new(x, y + size),
    ]
}

fn triangle_area(points: &[Point2<f64>], [a, b, c]: [usize; 3]) -> f64 {
    let (a, b, c) = (points[a], points[b], points[c]);
    ((b - a).perp(&(c - a)) / 2.0).abs()
}

fn centroid_in(square: &[Point2<f64>], p: Point2<f64>) -> bool {
    p.x > square[0].x && p.x < square[1].x && p.y > square[0].y && p.y < square[2].y
}

#[test]
fn test_floor_with_two_openings_covers_net_area() {
    let outer = square(0.0, 0.0, 10.0);
    let stair = square(2.0, 2.0, 2.0);
    let shaft = square(6.0, 5.0, 2.0);
    let rings = vec![outer, stair.clone(), shaft.clone()];
    let points: Vec<Point2<f64>> = rings.iter().flatten().copied().collect();

    let triangles = triangulate_rings(&rings, 0);
    assert!(!triangles.is_empty());

    let area: f64 = triangles.iter().map(|&t| triangle_area(&points, t)).sum();
    assert_relative_eq!(area, 100.0 - 4.0 - 4.0, epsilon = 1e-6);

    for &[a, b, c] in &triangles {
        let centroid = Point2::from((points[a].coords + points[b].coords + points[c].coords) / 3.0);
        assert!(!centroid_in(&stair, centroid), "triangle inside stair opening");
        assert!(!centroid_in(&shaft, centroid), "triangle inside shaft opening");
    }
}

#[test]
fn test_sloped_roof_bottom_follows_normal() {
    // Roof plane rising along Y at 30 degrees
    let rise = 30f64.to_radians().tan() * 4.0;
    let ring = vec![
        Point3::new(0.0, 0.0, 3.0),
        Point3::new(6.0, 0.0, 3.0),
        Point3::new(6.0, 4.0, 3.0 + rise),
        Point3::new(0.0, 4.0, 3.0 + rise),
    ];
    let thickness = 0.25;
    let mesh = extrude_surface(&[ring.clone()], thickness, 0.3).unwrap();
    assert_eq!(mesh.tag, MeshTag::SurfaceExtrusion);
    assert_eq!(mesh.vertex_count(), 8);

    let normal = (ring[1] - ring[0]).cross(&(ring[2] - ring[1])).normalize();
    for (i, top) in ring.iter().enumerate() {
        let bottom = mesh.vertex(i + 4).unwrap();
        let expected = top - normal * thickness;
        assert_relative_eq!(bottom.x, expected.x, epsilon = 1e-9);
        assert_relative_eq!(bottom.y, expected.y, epsilon = 1e-9);
        assert_relative_eq!(bottom.z, expected.z, epsilon = 1e-9);
    }
}

#[test]
fn test_brace_alignment_shifts_along_up() {
    let section = RectangularSection::new(0.2, 0.2);
    let start = Point3::new(0.0, 0.0, 0.0);
    let end = Point3::new(3.0, 0.0, 3.0);

    let middle = extrude_centerline(start, end, &section, VerticalAlignment::Middle).unwrap();
    let (min, max) = middle.bounds();
    assert_relative_eq!((min.y + max.y) / 2.0, 0.0, epsilon = 1e-9);
    assert_eq!(middle.face_count(), 6);

    let bottom = extrude_centerline(start, end, &section, VerticalAlignment::Bottom).unwrap();
    let (bottom_min, _) = bottom.bounds();
    assert!(bottom_min.z > min.z);
}
