use egui::Pos2;
use geo::{Coord, Rect};
use std::collections::HashMap;

use crate::dataset::DatasetId;
use crate::error::RenderError;
use crate::hit_testing;
use crate::layer::{LayerId, LayerSpec};
use crate::shape::Shape;

/// Camera change requested from a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraOptions {
    pub center: Option<Coord<f64>>,
    pub zoom: Option<f64>,
    /// Area that should become fully visible
    pub bounds: Option<Rect<f64>>,
    /// Screen padding kept around `bounds`, in pixels
    pub padding: f32,
}

impl CameraOptions {
    pub fn center_zoom(center: Coord<f64>, zoom: f64) -> Self {
        Self {
            center: Some(center),
            zoom: Some(zoom),
            bounds: None,
            padding: 0.0,
        }
    }

    /// Frame the given extent with padding
    pub fn fit(bounds: Rect<f64>, padding: f32) -> Self {
        Self {
            center: None,
            zoom: None,
            bounds: Some(bounds),
            padding,
        }
    }
}

/// Capabilities the viewer needs from the map it draws on.
///
/// Layer operations fail with [`RenderError::NotReady`] until the surface has
/// finished initializing.
pub trait RenderSurface {
    fn is_ready(&self) -> bool;

    /// Publish (or replace) the shapes of a data source
    fn set_source(&mut self, source: DatasetId, shapes: &[Shape]) -> Result<(), RenderError>;

    fn remove_source(&mut self, source: DatasetId);

    fn add_layer(&mut self, spec: LayerSpec) -> Result<LayerId, RenderError>;

    fn remove_layer(&mut self, layer: LayerId) -> Result<(), RenderError>;

    fn set_camera(&mut self, camera: CameraOptions);

    /// Shapes rendered under a screen position, topmost layer first
    fn shapes_at(&self, position: Pos2) -> Vec<Shape>;
}

/// A surface that draws nothing and records what it was asked to do.
///
/// Screen positions map one to one onto `(longitude, latitude)`. Useful for
/// driving a [`crate::MapSession`] without a window.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    ready: bool,
    sources: HashMap<DatasetId, Vec<Shape>>,
    /// Layers in the order they were added
    layers: Vec<(LayerId, LayerSpec)>,
    camera: Option<CameraOptions>,
    /// Every layer id ever removed, in order
    removed: Vec<LayerId>,
}

impl HeadlessSurface {
    /// A surface that is ready immediately
    pub fn new() -> Self {
        Self {
            ready: true,
            ..Default::default()
        }
    }

    /// A surface that stays uninitialized until [`Self::mark_ready`]
    pub fn uninitialized() -> Self {
        Self::default()
    }

    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    pub fn layers(&self) -> &[(LayerId, LayerSpec)] {
        &self.layers
    }

    pub fn layers_for(&self, source: DatasetId) -> Vec<&LayerSpec> {
        self.layers
            .iter()
            .filter(|(_, spec)| spec.source == source)
            .map(|(_, spec)| spec)
            .collect()
    }

    pub fn removed_layers(&self) -> &[LayerId] {
        &self.removed
    }

    pub fn source(&self, source: DatasetId) -> Option<&[Shape]> {
        self.sources.get(&source).map(Vec::as_slice)
    }

    /// A data source as the GeoJSON a real map would receive
    pub fn source_collection(&self, source: DatasetId) -> Option<geojson::FeatureCollection> {
        let shapes = self.sources.get(&source)?;
        Some(geojson::FeatureCollection {
            bbox: None,
            features: shapes.iter().map(Shape::to_feature).collect(),
            foreign_members: None,
        })
    }

    pub fn camera(&self) -> Option<&CameraOptions> {
        self.camera.as_ref()
    }
}

impl RenderSurface for HeadlessSurface {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn set_source(&mut self, source: DatasetId, shapes: &[Shape]) -> Result<(), RenderError> {
        if !self.ready {
            return Err(RenderError::NotReady);
        }
        self.sources.insert(source, shapes.to_vec());
        Ok(())
    }

    fn remove_source(&mut self, source: DatasetId) {
        self.sources.remove(&source);
    }

    fn add_layer(&mut self, spec: LayerSpec) -> Result<LayerId, RenderError> {
        if !self.ready {
            return Err(RenderError::NotReady);
        }
        let id = LayerId::new();
        self.layers.push((id, spec));
        Ok(id)
    }

    fn remove_layer(&mut self, layer: LayerId) -> Result<(), RenderError> {
        let index = self
            .layers
            .iter()
            .position(|(id, _)| *id == layer)
            .ok_or_else(|| RenderError::UnknownLayer(layer.to_string()))?;
        self.layers.remove(index);
        self.removed.push(layer);
        Ok(())
    }

    fn set_camera(&mut self, camera: CameraOptions) {
        self.camera = Some(camera);
    }

    fn shapes_at(&self, position: Pos2) -> Vec<Shape> {
        let target = Coord {
            x: f64::from(position.x),
            y: f64::from(position.y),
        };
        let mut hits = Vec::new();
        for (_, spec) in self.layers.iter().rev() {
            let Some(shapes) = self.sources.get(&spec.source) else {
                continue;
            };
            hits.extend(
                shapes
                    .iter()
                    .filter(|shape| shape.geometry.kind() == spec.kind.geometry())
                    .filter(|shape| hit_testing::hits(shape, target, hit_testing::DEFAULT_TOLERANCE))
                    .cloned(),
            );
        }
        hits
    }
}
