use crate::geom::{Point2, Point3, Transform, ViewProjection, ViewportProjection};

#[test]
fn projected_point_lies_on_its_view_ray() {
    let view = ViewportProjection::top_perspective(
        Point3::new(1.0, 2.0, 20.0),
        std::f64::consts::FRAC_PI_3,
        320.0,
        240.0,
    )
    .unwrap();
    let p = Point3::new(3.0, -1.0, 0.5);
    let screen = view.project_to_screen(p).unwrap();
    let ray = view.unproject_ray(screen).unwrap();

    let to_p = p - ray.origin;
    let along = to_p.dot(ray.direction);
    let off_ray = ray.at(along).distance_to(p);
    assert!(along > 0.0);
    assert!(off_ray < 1e-6);
}

#[test]
fn singular_matrix_is_rejected() {
    let flat = Transform::from_rows([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);
    assert!(ViewportProjection::new(flat, 100.0, 100.0, true).is_none());
    assert!(ViewportProjection::new(Transform::identity(), 0.0, 100.0, true).is_none());
}

#[test]
fn identity_view_maps_ndc_corners() {
    let view = ViewportProjection::new(Transform::identity(), 200.0, 100.0, true).unwrap();
    let corner = view.project_to_screen(Point3::new(-1.0, 1.0, 0.0)).unwrap();
    assert_eq!(corner, Point2::new(0.0, 100.0));
    assert!(view.is_on_screen(corner));
}
