use egui::Color32;

use crate::dataset::DatasetId;
use crate::drawing::DrawingEvent;
use crate::error::ParseError;
use crate::ingestion::IngestedFile;
use crate::measurement::Measurement;
use crate::shape::ShapeId;

/// Domain events fed into a [`crate::MapSession`], handled in arrival order
#[derive(Debug, Clone)]
pub enum ViewerEvent {
    /// An upload finished parsing
    FileIngested(IngestedFile),
    /// An upload was rejected
    UploadFailed {
        name: String,
        error: ParseError,
    },
    PropertySelected(String),
    PropertyCleared,
    ColorAssigned {
        value: String,
        color: Color32,
    },
    ShapeDrawn(DrawingEvent),
    DrawnShapeDeleted(ShapeId),
    /// The render surface finished initializing
    SurfaceReady,
    DatasetRemoved(DatasetId),
}

/// Notifications broadcast after a [`ViewerEvent`] was handled
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    DatasetAdded {
        id: DatasetId,
        name: String,
    },
    DuplicateIgnored {
        name: String,
    },
    UploadRejected {
        message: String,
    },
    DatasetRemoved {
        id: DatasetId,
    },
    /// The union of property names changed
    PropertiesChanged(Vec<String>),
    /// Values of the selected property were recomputed
    ValuesChanged {
        property: Option<String>,
        values: Vec<String>,
    },
    ShapesRecolored {
        value: String,
        count: usize,
    },
    LayersSynced {
        dataset: DatasetId,
    },
    LayersDeferred {
        dataset: DatasetId,
    },
    /// The surface rejected the dataset's layers
    LayersFailed {
        dataset: DatasetId,
    },
    MeasurementUpdated(Option<Measurement>),
}
