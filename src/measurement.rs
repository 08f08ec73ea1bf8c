//! Length, perimeter and area readouts for shapes.
//!
//! Lines and polygons are measured geodesically on the WGS84 ellipsoid, so
//! perimeters and areas share one metric. Circles use the closed-form
//! formulas on their stored radius.

use geo::{Coord, GeodesicArea, GeodesicLength, LineString, Polygon};
use std::f64::consts::PI;
use std::fmt;

use crate::error::GeometryError;
use crate::shape::{Shape, ShapeGeometry};

/// Text shown for shapes that have nothing to measure
pub const NOT_APPLICABLE_TEXT: &str = "No measurement for points";

/// Computed readout for one shape. All lengths in meters, areas in m².
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Circle { radius: f64, perimeter: f64, area: f64 },
    Line { length: f64 },
    Polygon { perimeter: f64, area: f64 },
    /// Plain points have no length or area
    NotApplicable,
}

impl Measurement {
    pub fn length(&self) -> Option<f64> {
        match self {
            Self::Line { length } => Some(*length),
            _ => None,
        }
    }

    pub fn perimeter(&self) -> Option<f64> {
        match self {
            Self::Circle { perimeter, .. } | Self::Polygon { perimeter, .. } => Some(*perimeter),
            _ => None,
        }
    }

    pub fn area(&self) -> Option<f64> {
        match self {
            Self::Circle { area, .. } | Self::Polygon { area, .. } => Some(*area),
            _ => None,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Circle { radius, perimeter, area } => write!(
                f,
                "Circle Measurements:\nRadius: {radius:.2} m\nPerimeter: {perimeter:.2} m\nArea: {area:.2} m²"
            ),
            Self::Line { length } => write!(f, "Line Measurements:\nLength: {length:.2} m"),
            Self::Polygon { perimeter, area } => write!(
                f,
                "Polygon Measurements:\nPerimeter: {perimeter:.2} m\nArea: {area:.2} m²"
            ),
            Self::NotApplicable => f.write_str(NOT_APPLICABLE_TEXT),
        }
    }
}

/// Measure a shape.
///
/// Degenerate geometry (a single-coordinate line, a collinear ring) measures
/// as zero. Lines or rings without any coordinates, non-finite coordinates and
/// invalid radii are errors.
pub fn measure(shape: &Shape) -> Result<Measurement, GeometryError> {
    match &shape.geometry {
        ShapeGeometry::Circle { radius, .. } => measure_circle(*radius),
        ShapeGeometry::LineString(line) => {
            check_coords(line)?;
            Ok(Measurement::Line {
                length: line.geodesic_length(),
            })
        }
        ShapeGeometry::Polygon(polygon) => measure_polygon(polygon),
        ShapeGeometry::Point(_) => Ok(Measurement::NotApplicable),
    }
}

/// Measure a shape and render the readout, logging and swallowing errors.
pub fn measure_text(shape: &Shape) -> Option<String> {
    match measure(shape) {
        Ok(measurement) => Some(measurement.to_string()),
        Err(err) => {
            log::debug!("Skipping measurement of shape {}: {}", shape.id, err);
            None
        }
    }
}

fn measure_circle(radius: f64) -> Result<Measurement, GeometryError> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(GeometryError::InvalidRadius(radius));
    }
    Ok(Measurement::Circle {
        radius,
        perimeter: 2.0 * PI * radius,
        area: PI * radius * radius,
    })
}

fn measure_polygon(polygon: &Polygon<f64>) -> Result<Measurement, GeometryError> {
    let exterior = polygon.exterior();
    check_coords(exterior)?;

    // Holes are ignored for both perimeter and area.
    let outer = Polygon::new(exterior.clone(), vec![]);
    Ok(Measurement::Polygon {
        perimeter: exterior.geodesic_length(),
        area: outer.geodesic_area_unsigned(),
    })
}

fn check_coords(line: &LineString<f64>) -> Result<(), GeometryError> {
    if line.0.is_empty() {
        return Err(GeometryError::MissingCoordinates);
    }
    if !line.coords().all(is_finite) {
        return Err(GeometryError::NonFiniteCoordinate);
    }
    Ok(())
}

fn is_finite(coord: &Coord<f64>) -> bool {
    coord.x.is_finite() && coord.y.is_finite()
}
