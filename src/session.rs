//! Session state and the event loop that drives the core components.
//!
//! All mutable viewer state lives in [`SessionState`]. [`MapSession`] owns it
//! together with a FIFO queue of [`ViewerEvent`]s; events are applied one at a
//! time against the latest state and each outcome is broadcast on the
//! [`EventBus`].

use std::collections::VecDeque;

use crate::color::{self, PropertyColorAssigner};
use crate::config::ViewerConfig;
use crate::dataset::{DatasetCollection, DatasetId};
use crate::drawing::DrawingSession;
use crate::event::{EventBus, EventHandler, SessionEvent, ViewerEvent};
use crate::ingestion::IngestedFile;
use crate::layer::{LayerRegistry, SyncOutcome};
use crate::measurement::Measurement;
use crate::surface::{CameraOptions, RenderSurface};

/// Everything the viewer knows during one session
#[derive(Debug, Clone)]
pub struct SessionState {
    pub datasets: DatasetCollection,
    /// Union of property names, in first-observation order
    pub properties: Vec<String>,
    pub colors: PropertyColorAssigner,
    pub drawing: DrawingSession,
    pub layers: LayerRegistry,
    /// Latest user-facing message, e.g. a rejected upload
    pub notice: Option<String>,
}

impl SessionState {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            datasets: DatasetCollection::new(),
            properties: Vec::new(),
            colors: PropertyColorAssigner::new(config.default_color32()),
            drawing: DrawingSession::new(),
            layers: LayerRegistry::new(),
            notice: None,
        }
    }

    /// The measurement readout currently shown
    pub fn measurement(&self) -> Option<Measurement> {
        self.drawing.latest()
    }
}

/// Owns the session state and applies queued events to it.
#[derive(Debug)]
pub struct MapSession {
    config: ViewerConfig,
    state: SessionState,
    queue: VecDeque<ViewerEvent>,
    event_bus: EventBus,
}

impl MapSession {
    pub fn new(config: ViewerConfig) -> Self {
        let state = SessionState::new(&config);
        Self {
            config,
            state,
            queue: VecDeque::new(),
            event_bus: EventBus::new(),
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Subscribe a handler to session notifications
    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        self.event_bus.subscribe(handler);
    }

    /// Queue an event for the next [`Self::process_events`]
    pub fn dispatch(&mut self, event: ViewerEvent) {
        self.queue.push_back(event);
    }

    pub fn has_pending_events(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn clear_notice(&mut self) {
        self.state.notice = None;
    }

    /// Apply every queued event in arrival order. Returns how many were handled.
    pub fn process_events(&mut self, surface: &mut dyn RenderSurface) -> usize {
        let mut handled = 0;
        while let Some(event) = self.queue.pop_front() {
            self.apply(event, surface);
            handled += 1;
        }
        handled
    }

    fn apply(&mut self, event: ViewerEvent, surface: &mut dyn RenderSurface) {
        match event {
            ViewerEvent::FileIngested(file) => self.add_file(file, surface),
            ViewerEvent::UploadFailed { name, error } => {
                log::warn!("Upload of {} rejected: {}", name, error);
                let message = format!("Could not load {name}: {error}");
                self.state.notice = Some(message.clone());
                self.event_bus.emit(SessionEvent::UploadRejected { message });
            }
            ViewerEvent::PropertySelected(name) => {
                let state = &mut self.state;
                state.colors.select_property(&name, &state.datasets);
                self.emit_values();
            }
            ViewerEvent::PropertyCleared => {
                self.state.colors.clear_selection();
                self.emit_values();
            }
            ViewerEvent::ColorAssigned { value, color } => {
                let state = &mut self.state;
                let count = state.colors.assign_color(&value, color, &mut state.datasets);
                self.event_bus.emit(SessionEvent::ShapesRecolored { value, count });
                // Every dataset owns its own layers, so each one is rebuilt.
                for id in self.state.datasets.ids() {
                    self.resync(id, surface);
                }
            }
            ViewerEvent::ShapeDrawn(drawing_event) => {
                let measurement = self.state.drawing.handle(drawing_event);
                self.event_bus.emit(SessionEvent::MeasurementUpdated(measurement));
            }
            ViewerEvent::DrawnShapeDeleted(id) => {
                if self.state.drawing.remove(id).is_some() {
                    let measurement = self.state.drawing.latest();
                    self.event_bus.emit(SessionEvent::MeasurementUpdated(measurement));
                }
            }
            ViewerEvent::SurfaceReady => {
                let state = &mut self.state;
                let replayed =
                    state
                        .layers
                        .resync_pending(&state.datasets, &self.config.default_color, surface);
                log::debug!("Surface ready, replayed {} deferred datasets", replayed.len());
                for (dataset, outcome) in replayed {
                    self.emit_sync(dataset, outcome);
                }
            }
            ViewerEvent::DatasetRemoved(id) => {
                self.state.layers.detach(id, surface);
                if let Some(dataset) = self.state.datasets.remove(id) {
                    log::info!("Removed dataset {}", dataset.name);
                    self.event_bus.emit(SessionEvent::DatasetRemoved { id });
                    self.refresh_properties();
                }
            }
        }
    }

    fn add_file(&mut self, file: IngestedFile, surface: &mut dyn RenderSurface) {
        let IngestedFile { dataset, extent } = file;
        let name = dataset.name.clone();
        let Some(id) = self.state.datasets.insert(dataset) else {
            self.event_bus.emit(SessionEvent::DuplicateIgnored { name });
            return;
        };
        self.state.notice = None;
        self.event_bus.emit(SessionEvent::DatasetAdded { id, name });

        self.refresh_properties();
        self.resync(id, surface);

        if let Some(extent) = extent {
            surface.set_camera(CameraOptions::fit(extent, self.config.camera_padding));
        }
    }

    fn resync(&mut self, id: DatasetId, surface: &mut dyn RenderSurface) {
        let state = &mut self.state;
        let Some(dataset) = state.datasets.get(id) else {
            return;
        };
        let outcome = state
            .layers
            .resync(dataset, &self.config.default_color, surface);
        self.emit_sync(id, outcome);
    }

    fn emit_sync(&self, dataset: DatasetId, outcome: SyncOutcome) {
        self.event_bus.emit(match outcome {
            SyncOutcome::Synced => SessionEvent::LayersSynced { dataset },
            SyncOutcome::Deferred => SessionEvent::LayersDeferred { dataset },
            SyncOutcome::Failed => SessionEvent::LayersFailed { dataset },
        });
    }

    /// Recompute the property union and the selected property's values
    fn refresh_properties(&mut self) {
        let properties = self.state.datasets.property_names();
        if properties != self.state.properties {
            self.state.properties = properties.clone();
            self.event_bus.emit(SessionEvent::PropertiesChanged(properties));
        }
        let state = &mut self.state;
        state.colors.refresh_values(&state.datasets);
        self.emit_values();
    }

    fn emit_values(&self) {
        self.event_bus.emit(SessionEvent::ValuesChanged {
            property: self.state.colors.selected_property().map(str::to_owned),
            values: self.state.colors.values().to_vec(),
        });
    }

    /// Property rows for the popup shown when the map is clicked.
    ///
    /// Empty values (`null`, `""`, `false`, `0`) are left out.
    pub fn inspect_at(&self, surface: &dyn RenderSurface, position: egui::Pos2) -> Vec<(String, String)> {
        surface
            .shapes_at(position)
            .iter()
            .flat_map(|shape| shape.properties.iter())
            .filter(|(_, value)| is_truthy(value))
            .filter_map(|(key, value)| color::value_key(value).map(|text| (key.clone(), text)))
            .collect()
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
