use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

use crate::dataset::{Dataset, DatasetCollection, DatasetId};
use crate::error::RenderError;
use crate::shape::{COLOR_PROPERTY, GeometryKind};
use crate::surface::RenderSurface;

/// A unique identifier for a layer attached to a render surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three kinds of rendering layer a dataset gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    /// Circles drawn at point positions
    Bubble,
    Line,
    Polygon,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [LayerKind::Bubble, LayerKind::Line, LayerKind::Polygon];

    /// Geometry this layer draws
    pub fn geometry(self) -> GeometryKind {
        match self {
            Self::Bubble => GeometryKind::Point,
            Self::Line => GeometryKind::LineString,
            Self::Polygon => GeometryKind::Polygon,
        }
    }

    /// Name of the style option the color expression is bound to
    pub fn color_option(self) -> &'static str {
        match self {
            Self::Bubble => "color",
            Self::Line => "strokeColor",
            Self::Polygon => "fillColor",
        }
    }
}

/// Description of a layer to add to a surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Data source the layer reads from
    pub source: DatasetId,
    pub kind: LayerKind,
    /// Color used when a shape has no `color` attribute, as `#rrggbb`
    pub default_color: String,
}

impl LayerSpec {
    pub fn new(source: DatasetId, kind: LayerKind, default_color: impl Into<String>) -> Self {
        Self {
            source,
            kind,
            default_color: default_color.into(),
        }
    }

    /// Filter expression selecting this layer's geometry type
    pub fn filter(&self) -> Value {
        json!(["==", "$type", self.kind.geometry().type_name()])
    }

    /// Style expression reading each shape's `color` attribute
    pub fn color_expression(&self) -> Value {
        json!(["coalesce", ["get", COLOR_PROPERTY], self.default_color])
    }

    /// Full layer options as the surface receives them
    pub fn options(&self) -> Value {
        let mut options = serde_json::Map::new();
        options.insert("filter".to_owned(), self.filter());
        options.insert(self.kind.color_option().to_owned(), self.color_expression());
        Value::Object(options)
    }
}

/// The live point/line/polygon layers of one dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderLayerSet {
    pub bubble: LayerId,
    pub line: LayerId,
    pub polygon: LayerId,
}

impl RenderLayerSet {
    pub fn ids(&self) -> [LayerId; 3] {
        [self.bubble, self.line, self.polygon]
    }
}

/// Outcome of a [`LayerRegistry::resync`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    /// The surface was not ready; the dataset is kept for a later replay
    Deferred,
    /// The surface rejected the layers; nothing of the dataset is left on it
    Failed,
}

/// Tracks which layer set is registered for each dataset.
///
/// At most one set exists per dataset; a stale set is removed from the
/// surface before its replacement is added.
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    sets: HashMap<DatasetId, RenderLayerSet>,
    pending: HashSet<DatasetId>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dataset: DatasetId) -> Option<&RenderLayerSet> {
        self.sets.get(&dataset)
    }

    /// Number of registered layer sets
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Datasets whose resync was deferred because the surface was not ready
    pub fn pending(&self) -> impl Iterator<Item = DatasetId> + '_ {
        self.pending.iter().copied()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Replace the dataset's layers with a fresh set bound to its current shapes.
    ///
    /// A surface that is not ready defers the dataset. Any other surface
    /// error is logged and leaves neither layers nor a source behind.
    pub fn resync(
        &mut self,
        dataset: &Dataset,
        default_color: &str,
        surface: &mut dyn RenderSurface,
    ) -> SyncOutcome {
        match self.try_resync(dataset, default_color, surface) {
            Ok(()) => {
                self.pending.remove(&dataset.id);
                SyncOutcome::Synced
            }
            Err(RenderError::NotReady) => {
                log::debug!("Surface not ready, deferring layers for {}", dataset.name);
                self.pending.insert(dataset.id);
                SyncOutcome::Deferred
            }
            Err(err) => {
                log::error!("Failed to sync layers for {}: {}", dataset.name, err);
                self.pending.remove(&dataset.id);
                SyncOutcome::Failed
            }
        }
    }

    fn try_resync(
        &mut self,
        dataset: &Dataset,
        default_color: &str,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), RenderError> {
        if !surface.is_ready() {
            return Err(RenderError::NotReady);
        }

        // Old layers go first so a shape is never drawn twice.
        if let Some(stale) = self.sets.remove(&dataset.id) {
            for layer in stale.ids() {
                if let Err(err) = surface.remove_layer(layer) {
                    log::warn!("Stale layer {} already gone: {}", layer, err);
                }
            }
        }

        surface.set_source(dataset.id, &dataset.shapes)?;

        let mut added = Vec::with_capacity(LayerKind::ALL.len());
        for kind in LayerKind::ALL {
            match surface.add_layer(LayerSpec::new(dataset.id, kind, default_color)) {
                Ok(layer) => added.push(layer),
                Err(err) => {
                    // A partial set would stay on the surface unregistered.
                    for layer in added {
                        if let Err(err) = surface.remove_layer(layer) {
                            log::warn!("Failed to roll back layer {}: {}", layer, err);
                        }
                    }
                    surface.remove_source(dataset.id);
                    return Err(err);
                }
            }
        }

        if let [bubble, line, polygon] = added[..] {
            let set = RenderLayerSet { bubble, line, polygon };
            log::debug!("Registered layers for {}: {:?}", dataset.name, set);
            self.sets.insert(dataset.id, set);
        }
        Ok(())
    }

    /// Resync every deferred dataset that is still loaded.
    ///
    /// Datasets removed while they were pending are forgotten.
    pub fn resync_pending(
        &mut self,
        datasets: &DatasetCollection,
        default_color: &str,
        surface: &mut dyn RenderSurface,
    ) -> Vec<(DatasetId, SyncOutcome)> {
        let pending: Vec<DatasetId> = self.pending.drain().collect();
        pending
            .into_iter()
            .filter_map(|id| datasets.get(id))
            .map(|dataset| (dataset.id, self.resync(dataset, default_color, surface)))
            .collect()
    }

    /// Remove a dataset's layers and data source from the surface.
    pub fn detach(&mut self, dataset: DatasetId, surface: &mut dyn RenderSurface) {
        self.pending.remove(&dataset);
        let Some(set) = self.sets.remove(&dataset) else {
            return;
        };
        for layer in set.ids() {
            if let Err(err) = surface.remove_layer(layer) {
                log::warn!("Failed to remove layer {}: {}", layer, err);
            }
        }
        surface.remove_source(dataset);
    }
}
