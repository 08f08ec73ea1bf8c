//! Turning uploaded GeoJSON files into datasets.

use futures::channel::oneshot;
use geo::{Coord, LineString, Polygon, Rect};
use geojson::{GeoJson, Geometry, Value as GeoValue};

use crate::config::ViewerConfig;
use crate::dataset::Dataset;
use crate::error::ParseError;
use crate::shape::{Properties, Shape, ShapeGeometry};

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedFile {
    pub dataset: Dataset,
    /// Bounding extent of the new data, `None` when it has no coordinates
    pub extent: Option<Rect<f64>>,
}

/// Parse an uploaded file into a dataset named after the file.
///
/// Files above `config.max_upload_bytes` are rejected before any parsing.
pub fn ingest(name: &str, bytes: &[u8], config: &ViewerConfig) -> Result<IngestedFile, ParseError> {
    if bytes.len() > config.max_upload_bytes {
        return Err(ParseError::TooLarge {
            size: bytes.len(),
            max: config.max_upload_bytes,
        });
    }

    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::NotUtf8)?;
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    let geojson =
        GeoJson::from_json_value(json).map_err(|e| ParseError::InvalidGeoJson(e.to_string()))?;

    let shapes = shapes_from_geojson(geojson)?;
    let dataset = Dataset::new(name, shapes);
    let extent = dataset.extent();
    log::info!("Parsed {}: {} shapes", name, dataset.shapes.len());

    Ok(IngestedFile { dataset, extent })
}

/// Flatten a GeoJSON document into shapes.
///
/// Features without geometry are skipped. Multi-geometries and geometry
/// collections become one shape per member, each with the feature's
/// properties.
pub fn shapes_from_geojson(geojson: GeoJson) -> Result<Vec<Shape>, ParseError> {
    let mut shapes = Vec::new();
    match geojson {
        GeoJson::FeatureCollection(collection) => {
            for feature in collection.features {
                push_feature(feature, &mut shapes)?;
            }
        }
        GeoJson::Feature(feature) => push_feature(feature, &mut shapes)?,
        GeoJson::Geometry(geometry) => push_geometry(&geometry, &Properties::new(), &mut shapes)?,
    }
    Ok(shapes)
}

fn push_feature(feature: geojson::Feature, shapes: &mut Vec<Shape>) -> Result<(), ParseError> {
    let properties = feature.properties.unwrap_or_default();
    match feature.geometry {
        Some(geometry) => push_geometry(&geometry, &properties, shapes),
        None => {
            log::debug!("Skipping feature without geometry");
            Ok(())
        }
    }
}

fn push_geometry(
    geometry: &Geometry,
    properties: &Properties,
    shapes: &mut Vec<Shape>,
) -> Result<(), ParseError> {
    match &geometry.value {
        GeoValue::Point(position) => {
            shapes.push(Shape::from_point(coord(position)?, properties.clone()));
        }
        GeoValue::MultiPoint(positions) => {
            for position in positions {
                shapes.push(Shape::from_point(coord(position)?, properties.clone()));
            }
        }
        GeoValue::LineString(positions) => {
            shapes.push(line_shape(positions, properties)?);
        }
        GeoValue::MultiLineString(lines) => {
            for positions in lines {
                shapes.push(line_shape(positions, properties)?);
            }
        }
        GeoValue::Polygon(rings) => {
            shapes.push(polygon_shape(rings, properties)?);
        }
        GeoValue::MultiPolygon(polygons) => {
            for rings in polygons {
                shapes.push(polygon_shape(rings, properties)?);
            }
        }
        GeoValue::GeometryCollection(members) => {
            for member in members {
                push_geometry(member, properties, shapes)?;
            }
        }
    }
    Ok(())
}

fn coord(position: &[f64]) -> Result<Coord<f64>, ParseError> {
    match position {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(ParseError::InvalidGeoJson(format!(
            "position needs at least two values, got {}",
            position.len()
        ))),
    }
}

fn line_string(positions: &[Vec<f64>]) -> Result<LineString<f64>, ParseError> {
    positions
        .iter()
        .map(|p| coord(p))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn line_shape(positions: &[Vec<f64>], properties: &Properties) -> Result<Shape, ParseError> {
    Ok(Shape::new(
        ShapeGeometry::LineString(line_string(positions)?),
        properties.clone(),
    ))
}

fn polygon_shape(rings: &[Vec<Vec<f64>>], properties: &Properties) -> Result<Shape, ParseError> {
    let mut rings = rings.iter().map(|ring| line_string(ring));
    let exterior = rings.next().transpose()?.unwrap_or_else(|| LineString::new(vec![]));
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Shape::new(
        ShapeGeometry::Polygon(Polygon::new(exterior, interiors)),
        properties.clone(),
    ))
}

pub type ParseResult = Result<IngestedFile, ParseError>;

struct PendingParse {
    generation: u64,
    name: String,
    receiver: oneshot::Receiver<ParseResult>,
}

/// The upload overlay's lifetime and the parses started from it.
///
/// Parses run off the UI thread where threads exist. A result is delivered
/// only if the overlay session that started it is still open; results of a
/// closed or reopened session are dropped.
#[derive(Default)]
pub struct UploadSession {
    generation: u64,
    open: bool,
    in_flight: Vec<PendingParse>,
}

impl std::fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSession")
            .field("generation", &self.generation)
            .field("open", &self.open)
            .field("in_flight", &format!("<{} parses>", self.in_flight.len()))
            .finish()
    }
}

impl UploadSession {
    /// A closed session
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new overlay session. Earlier in-flight parses become stale.
    pub fn begin(&mut self) {
        self.generation += 1;
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether any parse is still running
    pub fn is_busy(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Start parsing a file for the current session.
    pub fn spawn_parse(&mut self, name: String, bytes: Vec<u8>, config: &ViewerConfig) {
        let (sender, receiver) = oneshot::channel();
        let config = config.clone();
        let job_name = name.clone();
        let job = move || {
            let result = ingest(&job_name, &bytes, &config);
            // The receiver is gone when the app shut down first.
            let _ = sender.send(result);
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let spawned = std::thread::Builder::new()
                .name("geojson-parse".to_owned())
                .spawn(job);
            if let Err(err) = spawned {
                log::error!("Failed to spawn parse thread for {}: {}", name, err);
            }
        }

        #[cfg(target_arch = "wasm32")]
        job();

        self.in_flight.push(PendingParse {
            generation: self.generation,
            name,
            receiver,
        });
    }

    /// Take the next finished parse that still belongs to the open session,
    /// together with the name of the file it came from.
    pub fn poll(&mut self) -> Option<(String, ParseResult)> {
        let mut delivered = None;
        let (generation, open) = (self.generation, self.open);
        self.in_flight.retain_mut(|pending| {
            if delivered.is_some() {
                return true;
            }
            match pending.receiver.try_recv() {
                Ok(Some(result)) => {
                    if open && pending.generation == generation {
                        delivered = Some((pending.name.clone(), result));
                    } else {
                        log::debug!("Dropping parse of {} from a closed upload", pending.name);
                    }
                    false
                }
                Ok(None) => true,
                Err(_) => {
                    log::warn!("Parse of {} was cancelled", pending.name);
                    false
                }
            }
        });
        delivered
    }
}
