use egui::{Align2, Color32, Id, Pos2, Sense};

use crate::canvas::CanvasSurface;
use crate::config::ViewerConfig;
use crate::event::ViewerEvent;
use crate::file_handler::{self, FileHandler};
use crate::ingestion::UploadSession;
use crate::input::{InputEvent, InputHandler};
use crate::session::MapSession;
use crate::tools::{DrawTool, DrawingToolbar};

/// Hint shown in the upload overlay
pub const UPLOAD_HINT: &str = "Max file size is 500kb. Supported file types are .json and .geojson.";

const DRAWING_COLOR: Color32 = Color32::from_rgb(0x1e, 0x88, 0xe5);

/// Property rows shown where the map was clicked
#[derive(Debug, Clone)]
struct Popup {
    position: Pos2,
    rows: Vec<(String, String)>,
}

pub struct GeoViewApp {
    session: MapSession,
    canvas: CanvasSurface,
    uploads: UploadSession,
    input: InputHandler,
    toolbar: DrawingToolbar,
    file_handler: FileHandler,
    panel_hidden: bool,
    /// Whether `SurfaceReady` was dispatched for the canvas
    surface_announced: bool,
    popup: Option<Popup>,
}

impl GeoViewApp {
    /// Called once before the first frame.
    pub fn new(_cc: &eframe::CreationContext<'_>, config: ViewerConfig) -> Self {
        Self::with_config(config)
    }

    pub fn with_config(config: ViewerConfig) -> Self {
        Self {
            canvas: CanvasSurface::new(&config),
            session: MapSession::new(config),
            uploads: UploadSession::new(),
            input: InputHandler::new(),
            toolbar: DrawingToolbar::new(),
            file_handler: FileHandler::new(),
            panel_hidden: false,
            surface_announced: false,
            popup: None,
        }
    }

    pub fn session(&self) -> &MapSession {
        &self.session
    }

    /// Hand finished parses to the session
    fn poll_uploads(&mut self, ctx: &egui::Context) {
        while let Some((name, result)) = self.uploads.poll() {
            match result {
                Ok(file) => {
                    log::info!("Parsed {} ({} shapes)", name, file.dataset.shapes.len());
                    self.session.dispatch(ViewerEvent::FileIngested(file));
                    self.uploads.close();
                    self.panel_hidden = true;
                }
                Err(error) => self.session.dispatch(ViewerEvent::UploadFailed { name, error }),
            }
        }
        if self.uploads.is_busy() {
            ctx.request_repaint();
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        self.file_handler.preview_files_being_dropped(ctx);
        if !self.file_handler.check_for_dropped_files(ctx) {
            return;
        }
        if !self.uploads.is_open() {
            self.uploads.begin();
        }
        let selection =
            file_handler::select_upload(self.file_handler.take_dropped_files(), self.uploads.is_busy());
        if let Some(upload) = selection.upload {
            self.uploads
                .spawn_parse(upload.name, upload.bytes, self.session.config());
        }
        for (name, error) in selection.rejected {
            self.session.dispatch(ViewerEvent::UploadFailed { name, error });
        }
        ctx.request_repaint();
    }

    fn upload_overlay(&mut self, ctx: &egui::Context) {
        if !self.uploads.is_open() {
            return;
        }
        let mut close = false;
        egui::Window::new("Upload GeoJSON")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label("Drop a file anywhere on this window.");
                ui.small(UPLOAD_HINT);
                if self.uploads.is_busy() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Parsing…");
                    });
                }
                if let Some(notice) = &self.session.state().notice {
                    ui.colored_label(ui.visuals().error_fg_color, notice);
                }
                close = ui.button("Close").clicked();
            });
        if close {
            self.uploads.close();
        }
    }

    fn side_panel(&mut self, ctx: &egui::Context) {
        if self.panel_hidden {
            return;
        }
        let mut events = Vec::new();
        let mut clear_notice = false;
        egui::SidePanel::left("datasets_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("GeoJSON Viewer");
                if ui.button("Open File Upload").clicked() {
                    self.uploads.begin();
                }

                let state = self.session.state();
                if let Some(notice) = &state.notice {
                    ui.horizontal_wrapped(|ui| {
                        ui.colored_label(ui.visuals().error_fg_color, notice);
                        clear_notice = ui.small_button("Dismiss").clicked();
                    });
                }
                ui.separator();

                egui::CollapsingHeader::new(format!("Uploaded files ({})", state.datasets.len()))
                    .default_open(true)
                    .show(ui, |ui| {
                        if state.datasets.is_empty() {
                            ui.weak("Nothing uploaded yet");
                        }
                        for dataset in state.datasets.iter() {
                            ui.horizontal(|ui| {
                                ui.label(&dataset.name);
                                if ui.small_button("Remove").clicked() {
                                    events.push(ViewerEvent::DatasetRemoved(dataset.id));
                                }
                            });
                        }
                    });
                ui.separator();

                let selected = state.colors.selected_property();
                egui::ComboBox::from_label("Color by property")
                    .selected_text(selected.unwrap_or("None"))
                    .show_ui(ui, |ui| {
                        if ui.selectable_label(selected.is_none(), "None").clicked() {
                            events.push(ViewerEvent::PropertyCleared);
                        }
                        for property in &state.properties {
                            if ui
                                .selectable_label(selected == Some(property.as_str()), property)
                                .clicked()
                            {
                                events.push(ViewerEvent::PropertySelected(property.clone()));
                            }
                        }
                    });

                egui::ScrollArea::vertical().show(ui, |ui| {
                    for value in state.colors.values() {
                        ui.horizontal(|ui| {
                            let mut color = state
                                .colors
                                .assignment()
                                .get(value)
                                .unwrap_or(state.colors.default_color());
                            if ui.color_edit_button_srgba(&mut color).changed() {
                                events.push(ViewerEvent::ColorAssigned {
                                    value: value.clone(),
                                    color,
                                });
                            }
                            ui.label(value);
                        });
                    }
                });
            });

        if clear_notice {
            self.session.clear_notice();
        }
        for event in events {
            self.session.dispatch(event);
        }
    }

    fn panel_toggle(&mut self, ctx: &egui::Context) {
        egui::Area::new(Id::new("panel_toggle"))
            .anchor(Align2::RIGHT_TOP, egui::vec2(-8.0, 8.0))
            .show(ctx, |ui| {
                let label = if self.panel_hidden { "Show panel" } else { "Hide panel" };
                if ui.button(label).clicked() {
                    self.panel_hidden = !self.panel_hidden;
                }
            });
    }

    fn drawing_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("Draw")
            .resizable(false)
            .anchor(Align2::RIGHT_TOP, egui::vec2(-8.0, 40.0))
            .show(ctx, |ui| {
                for tool in DrawTool::ALL {
                    let active = self.toolbar.active_tool() == Some(tool);
                    if ui.selectable_label(active, tool.name()).clicked() {
                        self.toolbar.set_active_tool(if active { None } else { Some(tool) });
                    }
                }
                ui.separator();
                let last = self.session.state().drawing.completed().last().cloned();
                if self.toolbar.is_editing() {
                    if ui.button("Done editing").clicked() {
                        self.toolbar.stop_editing();
                    }
                } else if ui
                    .add_enabled(last.is_some(), egui::Button::new("Edit last drawing"))
                    .clicked()
                {
                    if let Some(shape) = last.clone() {
                        self.toolbar.edit(shape);
                    }
                }
                if ui
                    .add_enabled(last.is_some(), egui::Button::new("Delete last drawing"))
                    .clicked()
                {
                    if let Some(shape) = last {
                        self.toolbar.stop_editing();
                        self.session.dispatch(ViewerEvent::DrawnShapeDeleted(shape.id));
                    }
                }
            });
    }

    fn measurement_readout(&self, ctx: &egui::Context) {
        let Some(measurement) = self.session.state().measurement() else {
            return;
        };
        egui::Area::new(Id::new("measurement_readout"))
            .anchor(Align2::LEFT_BOTTOM, egui::vec2(8.0, -8.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(measurement.to_string());
                });
            });
    }

    fn property_popup(&mut self, ctx: &egui::Context) {
        let Some(popup) = &self.popup else {
            return;
        };
        let mut close = false;
        egui::Area::new(Id::new("property_popup"))
            .fixed_pos(popup.position)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    egui::Grid::new("property_rows").striped(true).show(ui, |ui| {
                        for (key, value) in &popup.rows {
                            ui.strong(key);
                            ui.label(value);
                            ui.end_row();
                        }
                    });
                    close = ui.small_button("Close").clicked();
                });
            });
        if close {
            self.popup = None;
        }
    }

    fn map(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::from_gray(235)))
            .show(ctx, |ui| {
                let (response, painter) =
                    ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
                let rect = response.rect;

                self.canvas.set_viewport(rect);
                self.input.set_map_rect(rect);
                if !self.surface_announced {
                    self.surface_announced = true;
                    self.session.dispatch(ViewerEvent::SurfaceReady);
                }

                let was_drawing = self.toolbar.active_tool().is_some() || self.toolbar.is_editing();
                let scroll = if response.hovered() {
                    ctx.input(|i| i.smooth_scroll_delta)
                } else {
                    egui::Vec2::ZERO
                };
                self.canvas.handle_navigation(&response, scroll, !was_drawing);

                let pointer_free = response.hovered() || response.dragged();
                for event in self.input.process_input(ctx, pointer_free) {
                    let canvas = &self.canvas;
                    if let Some(drawing) = self.toolbar.handle_input(&event, |p| canvas.unproject(p)) {
                        self.session.dispatch(ViewerEvent::ShapeDrawn(drawing));
                    }
                    if !was_drawing {
                        if let InputEvent::PointerUp { position } = event {
                            if response.clicked() {
                                self.popup = self.inspect(position);
                            }
                        }
                    }
                }

                if self.session.process_events(&mut self.canvas) > 0 {
                    ctx.request_repaint();
                }

                self.canvas.paint(&painter);
                let drawing = &self.session.state().drawing;
                self.canvas
                    .paint_overlay(&painter, drawing.completed(), DRAWING_COLOR);
                if let Some(preview) = self.toolbar.current_preview() {
                    self.canvas
                        .paint_overlay(&painter, std::slice::from_ref(&preview), DRAWING_COLOR);
                }
            });
    }

    fn inspect(&self, position: Pos2) -> Option<Popup> {
        let rows = self.session.inspect_at(&self.canvas, position);
        (!rows.is_empty()).then_some(Popup { position, rows })
    }
}

impl eframe::App for GeoViewApp {
    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_uploads(ctx);
        self.handle_dropped_files(ctx);

        self.side_panel(ctx);
        self.map(ctx);

        self.panel_toggle(ctx);
        self.upload_overlay(ctx);
        self.drawing_window(ctx);
        self.measurement_readout(ctx);
        self.property_popup(ctx);
    }
}
