use crate::geom::{
    Plane, Point2, Point3, Vec3, closest_points_line_line, intersect_line_plane,
    intersect_segments_2d,
};

#[test]
fn segments_crossing_at_center() {
    let hit = intersect_segments_2d(
        Point2::new(0.0, 0.0),
        Point2::new(10.0, 10.0),
        Point2::new(0.0, 10.0),
        Point2::new(10.0, 0.0),
    )
    .unwrap();
    assert!((hit.x - 5.0).abs() < 1e-12);
    assert!((hit.y - 5.0).abs() < 1e-12);
}

#[test]
fn segments_touching_at_endpoint_count() {
    let hit = intersect_segments_2d(
        Point2::new(0.0, 0.0),
        Point2::new(4.0, 0.0),
        Point2::new(4.0, -2.0),
        Point2::new(4.0, 2.0),
    );
    assert!(hit.is_some());
}

#[test]
fn collinear_segments_do_not_intersect() {
    let hit = intersect_segments_2d(
        Point2::new(0.0, 0.0),
        Point2::new(4.0, 0.0),
        Point2::new(2.0, 0.0),
        Point2::new(6.0, 0.0),
    );
    assert!(hit.is_none());
}

#[test]
fn line_parallel_to_plane_misses() {
    let hit = intersect_line_plane(
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(5.0, 0.0, 1.0),
        Point3::ORIGIN,
        Vec3::Z,
    );
    assert!(hit.is_none());
}

#[test]
fn line_extends_past_segment_to_plane() {
    let hit = intersect_line_plane(
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(3.0, 0.0, 0.0),
        Point3::ORIGIN,
        Vec3::X,
    )
    .unwrap();
    assert!(hit.distance_to(Point3::ORIGIN) < 1e-12);
}

#[test]
fn skew_lines_closest_points() {
    let (a, b) = closest_points_line_line(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(3.0, -1.0, 2.0),
        Point3::new(3.0, 1.0, 2.0),
    )
    .unwrap();
    assert!(a.distance_to(Point3::new(3.0, 0.0, 0.0)) < 1e-12);
    assert!(b.distance_to(Point3::new(3.0, 0.0, 2.0)) < 1e-12);
}

#[test]
fn plane_signed_distance_follows_normal() {
    let plane = Plane::new(Point3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -3.0, 0.0)).unwrap();
    assert!((plane.signed_distance(Point3::new(7.0, 0.0, 0.0)) - 1.0).abs() < 1e-12);
    assert!((plane.signed_distance(Point3::new(7.0, 3.0, 0.0)) + 2.0).abs() < 1e-12);
}
