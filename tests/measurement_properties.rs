use eframe_geoview::measurement::{self, Measurement};
use eframe_geoview::shape::{Properties, Shape, ShapeGeometry};
use geo::{GeodesicDestination, LineString, Point, Polygon, coord};
use std::f64::consts::PI;

// Corners of a 100 m x 100 m square built geodesically from (10, 45)
fn square_ring() -> Vec<(f64, f64)> {
    let origin = Point::new(10.0, 45.0);
    let east = origin.geodesic_destination(90.0, 100.0);
    let north_east = east.geodesic_destination(0.0, 100.0);
    let north = origin.geodesic_destination(0.0, 100.0);
    vec![
        origin.x_y(),
        east.x_y(),
        north_east.x_y(),
        north.x_y(),
        origin.x_y(),
    ]
}

fn polygon(exterior: Vec<(f64, f64)>, holes: Vec<Vec<(f64, f64)>>) -> Shape {
    let holes = holes.into_iter().map(LineString::from).collect();
    Shape::new(
        ShapeGeometry::Polygon(Polygon::new(LineString::from(exterior), holes)),
        Properties::new(),
    )
}

#[test]
fn test_square_perimeter_and_area() {
    let square = polygon(square_ring(), vec![]);
    let Measurement::Polygon { perimeter, area } = measurement::measure(&square).unwrap() else {
        panic!("expected a polygon measurement");
    };

    assert!((perimeter - 400.0).abs() < 0.5, "perimeter was {perimeter}");
    assert!((area - 10_000.0).abs() < 10.0, "area was {area}");
}

#[test]
fn test_reversed_ring_measures_the_same() {
    let ring = square_ring();
    let mut reversed = ring.clone();
    reversed.reverse();

    let forward = measurement::measure(&polygon(ring, vec![])).unwrap();
    let backward = measurement::measure(&polygon(reversed, vec![])).unwrap();

    let (Some(a), Some(b)) = (forward.area(), backward.area()) else {
        panic!("polygons have an area");
    };
    assert!((a - b).abs() < 1e-6);
    assert!((forward.perimeter().unwrap() - backward.perimeter().unwrap()).abs() < 1e-6);
}

#[test]
fn test_holes_do_not_change_measurement() {
    let hole = vec![
        (10.0002, 45.0002),
        (10.0004, 45.0002),
        (10.0004, 45.0004),
        (10.0002, 45.0002),
    ];
    let plain = measurement::measure(&polygon(square_ring(), vec![])).unwrap();
    let holed = measurement::measure(&polygon(square_ring(), vec![hole])).unwrap();
    assert_eq!(plain, holed);
}

#[test]
fn test_collinear_polygon_has_no_area() {
    let flat = polygon(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 0.0)], vec![]);
    let area = measurement::measure(&flat).unwrap().area().unwrap();
    assert!(area.abs() < 1.0, "area was {area}");
}

#[test]
fn test_circle_measurements_follow_radius() {
    let circle = Shape::circle(coord! { x: 3.0, y: 50.0 }, 250.0);
    let measured = measurement::measure(&circle).unwrap();

    assert_eq!(
        measured,
        Measurement::Circle {
            radius: 250.0,
            perimeter: 2.0 * PI * 250.0,
            area: PI * 250.0 * 250.0,
        }
    );
    assert!(measured.to_string().starts_with("Circle Measurements:\nRadius: 250.00 m"));
}

#[test]
fn test_line_length_is_additive() {
    let whole = Shape::new(
        ShapeGeometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)])),
        Properties::new(),
    );
    let first = Shape::new(
        ShapeGeometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 0.0)])),
        Properties::new(),
    );
    let second = Shape::new(
        ShapeGeometry::LineString(LineString::from(vec![(1.0, 0.0), (1.0, 1.0)])),
        Properties::new(),
    );

    let total = measurement::measure(&whole).unwrap().length().unwrap();
    let parts = measurement::measure(&first).unwrap().length().unwrap()
        + measurement::measure(&second).unwrap().length().unwrap();
    assert!((total - parts).abs() < 1e-6);
}

#[test]
fn test_points_have_no_measurement() {
    let point = Shape::from_point(coord! { x: 0.0, y: 0.0 }, Properties::new());
    assert_eq!(measurement::measure(&point), Ok(Measurement::NotApplicable));
    assert_eq!(
        measurement::measure_text(&point).as_deref(),
        Some(measurement::NOT_APPLICABLE_TEXT)
    );
}

#[test]
fn test_reversed_line_has_same_length() {
    let path = vec![(13.40, 52.52), (13.75, 52.40), (14.55, 52.35), (14.20, 51.95)];
    let mut reversed = path.clone();
    reversed.reverse();

    let line = |coords: Vec<(f64, f64)>| Shape::new(ShapeGeometry::LineString(LineString::from(coords)), Properties::new());
    let forward = measurement::measure(&line(path)).unwrap().length().unwrap();
    let backward = measurement::measure(&line(reversed)).unwrap().length().unwrap();

    assert!(forward > 100_000.0, "length was {forward}");
    assert!((forward - backward).abs() < 1e-6, "{forward} != {backward}");
}
