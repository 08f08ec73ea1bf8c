use geo::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Reserved attribute that drives rendering color.
pub const COLOR_PROPERTY: &str = "color";
/// Attribute marking a point as a circle (extended GeoJSON).
pub const SUB_TYPE_PROPERTY: &str = "subType";
/// Circle radius attribute, in meters.
pub const RADIUS_PROPERTY: &str = "radius";

/// Insertion-ordered attribute map of a shape.
pub type Properties = Map<String, Value>;

/// A unique identifier for a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeId(pub Uuid);

impl ShapeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShapeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geometry kinds that get their own render layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
}

impl GeometryKind {
    /// The GeoJSON type name used in layer filters
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
        }
    }
}

/// Geometry of a single shape. Coordinates are `x = longitude, y = latitude`.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    Point(Coord<f64>),
    /// A point with a radius in meters
    Circle { center: Coord<f64>, radius: f64 },
    LineString(LineString<f64>),
    Polygon(Polygon<f64>),
}

impl ShapeGeometry {
    /// The layer kind this geometry renders on. Circles render as points.
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) | Self::Circle { .. } => GeometryKind::Point,
            Self::LineString(_) => GeometryKind::LineString,
            Self::Polygon(_) => GeometryKind::Polygon,
        }
    }

    /// All coordinates, exterior ring first for polygons
    pub fn coords(&self) -> Box<dyn Iterator<Item = Coord<f64>> + '_> {
        match self {
            Self::Point(c) | Self::Circle { center: c, .. } => Box::new(std::iter::once(*c)),
            Self::LineString(line) => Box::new(line.coords().copied()),
            Self::Polygon(polygon) => Box::new(
                polygon
                    .exterior()
                    .coords()
                    .chain(polygon.interiors().iter().flat_map(|ring| ring.coords()))
                    .copied(),
            ),
        }
    }
}

/// A single geometric feature with attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: ShapeId,
    pub geometry: ShapeGeometry,
    pub properties: Properties,
}

impl Shape {
    pub fn new(geometry: ShapeGeometry, properties: Properties) -> Self {
        Self {
            id: ShapeId::new(),
            geometry,
            properties,
        }
    }

    /// Build a shape from a plain point, promoting it to a circle when its
    /// properties say `subType: "Circle"` and carry a numeric `radius`.
    pub fn from_point(center: Coord<f64>, properties: Properties) -> Self {
        let is_circle = properties
            .get(SUB_TYPE_PROPERTY)
            .and_then(Value::as_str)
            .is_some_and(|sub_type| sub_type.eq_ignore_ascii_case("circle"));
        let radius = properties.get(RADIUS_PROPERTY).and_then(Value::as_f64);

        let geometry = match (is_circle, radius) {
            (true, Some(radius)) => ShapeGeometry::Circle { center, radius },
            _ => ShapeGeometry::Point(center),
        };
        Self::new(geometry, properties)
    }

    /// Build a circle, recording the radius and sub type as attributes the
    /// same way uploaded circles carry them.
    pub fn circle(center: Coord<f64>, radius: f64) -> Self {
        let mut properties = Properties::new();
        properties.insert(SUB_TYPE_PROPERTY.to_owned(), Value::from("Circle"));
        properties.insert(RADIUS_PROPERTY.to_owned(), Value::from(radius));
        Self::new(ShapeGeometry::Circle { center, radius }, properties)
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Current value of the reserved `color` attribute
    pub fn color_attribute(&self) -> Option<&str> {
        self.properties.get(COLOR_PROPERTY).and_then(Value::as_str)
    }

    pub fn set_color_attribute(&mut self, hex: String) {
        self.properties.insert(COLOR_PROPERTY.to_owned(), Value::String(hex));
    }

    /// GeoJSON representation, used to publish shapes to a render surface
    pub fn to_feature(&self) -> geojson::Feature {
        let value = match &self.geometry {
            ShapeGeometry::Point(c) | ShapeGeometry::Circle { center: c, .. } => {
                geojson::Value::from(&geo::Point::from(*c))
            }
            ShapeGeometry::LineString(line) => geojson::Value::from(line),
            ShapeGeometry::Polygon(polygon) => geojson::Value::from(polygon),
        };
        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(value)),
            id: Some(geojson::feature::Id::String(self.id.to_string())),
            properties: Some(self.properties.clone()),
            foreign_members: None,
        }
    }
}
