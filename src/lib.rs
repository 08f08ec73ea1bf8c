#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod canvas;
pub mod color;
pub mod config;
pub mod dataset;
pub mod drawing;
pub mod error;
pub mod event;
pub mod file_handler;
pub mod hit_testing;
pub mod ingestion;
pub mod input;
pub mod layer;
pub mod measurement;
pub mod session;
pub mod shape;
pub mod surface;
pub mod tools;

pub use app::GeoViewApp;
pub use canvas::CanvasSurface;
pub use color::PropertyColorAssigner;
pub use config::ViewerConfig;
pub use dataset::{Dataset, DatasetCollection, DatasetId};
pub use drawing::{DrawingEvent, DrawingSession};
pub use error::{ConfigError, GeometryError, ParseError, RenderError};
pub use event::{EventHandler, EventLog, SessionEvent, ViewerEvent};
pub use ingestion::{IngestedFile, UploadSession, ingest};
pub use layer::{LayerKind, LayerRegistry, LayerSpec};
pub use measurement::{Measurement, measure};
pub use session::{MapSession, SessionState};
pub use shape::{Shape, ShapeGeometry, ShapeId};
pub use surface::{CameraOptions, HeadlessSurface, RenderSurface};
pub use tools::{DrawTool, DrawingToolbar};
