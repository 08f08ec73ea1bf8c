use geo::{Contains, Coord, EuclideanDistance, Point};

use crate::shape::{Shape, ShapeGeometry};

/// Hit distance in degrees when the caller has no zoom-dependent value
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Length of one degree of longitude at the equator (WGS84), in meters
pub const METERS_PER_DEGREE: f64 = 111_319.49;

/// Whether `target` (lon/lat) falls on the shape, allowing `tolerance` degrees.
///
/// Circles are hit anywhere inside their radius, polygons anywhere inside
/// their exterior ring.
pub fn hits(shape: &Shape, target: Coord<f64>, tolerance: f64) -> bool {
    let point = Point::from(target);
    match &shape.geometry {
        ShapeGeometry::Point(c) => point.euclidean_distance(&Point::from(*c)) <= tolerance,
        ShapeGeometry::Circle { center, radius } => {
            let reach = tolerance.max(radius / METERS_PER_DEGREE);
            point.euclidean_distance(&Point::from(*center)) <= reach
        }
        ShapeGeometry::LineString(line) => {
            !line.0.is_empty() && point.euclidean_distance(line) <= tolerance
        }
        ShapeGeometry::Polygon(polygon) => {
            if polygon.exterior().0.is_empty() {
                return false;
            }
            polygon.contains(&point) || point.euclidean_distance(polygon.exterior()) <= tolerance
        }
    }
}
