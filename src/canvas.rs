//! An egui painter acting as the map.
//!
//! Longitude and latitude map linearly onto the screen; the camera is a
//! center plus a zoom level where zoom 0 shows 256 pixels per 360 degrees.

use egui::{Color32, Painter, Pos2, Rect, Response, Stroke, Vec2};
use geo::{Coord, IsConvex, LineString};
use std::collections::HashMap;

use crate::config::ViewerConfig;
use crate::dataset::DatasetId;
use crate::error::RenderError;
use crate::hit_testing::{self, METERS_PER_DEGREE};
use crate::layer::{LayerId, LayerKind, LayerSpec};
use crate::shape::{GeometryKind, Shape, ShapeGeometry};
use crate::surface::{CameraOptions, RenderSurface};

const MIN_ZOOM: f64 = 0.0;
const MAX_ZOOM: f64 = 22.0;
/// Zoom used when framing data with no area, e.g. a single point
const POINT_ZOOM: f64 = 14.0;
/// Hit distance around shapes, in pixels
const HIT_TOLERANCE_PX: f64 = 6.0;
const POLYGON_FILL_ALPHA: u8 = 96;

#[derive(Debug)]
pub struct CanvasSurface {
    viewport: Option<Rect>,
    center: Coord<f64>,
    zoom: f64,
    sources: HashMap<DatasetId, Vec<Shape>>,
    layers: Vec<(LayerId, LayerSpec)>,
    /// Camera request that arrived before the viewport was known
    pending_camera: Option<CameraOptions>,
    point_radius: f32,
    line_width: f32,
    default_color: Color32,
}

impl CanvasSurface {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            viewport: None,
            center: Coord {
                x: config.initial_center[0],
                y: config.initial_center[1],
            },
            zoom: config.initial_zoom,
            sources: HashMap::new(),
            layers: Vec::new(),
            pending_camera: None,
            point_radius: config.point_radius,
            line_width: config.line_width,
            default_color: config.default_color32(),
        }
    }

    /// Set the screen area the map occupies. The first call makes the
    /// surface ready.
    pub fn set_viewport(&mut self, rect: Rect) {
        self.viewport = Some(rect);
        if let Some(camera) = self.pending_camera.take() {
            self.set_camera(camera);
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn center(&self) -> Coord<f64> {
        self.center
    }

    fn pixels_per_degree(&self) -> f64 {
        256.0 * 2f64.powf(self.zoom) / 360.0
    }

    fn viewport_center(&self) -> Pos2 {
        self.viewport.map_or(Pos2::ZERO, |rect| rect.center())
    }

    /// Screen position of a lon/lat coordinate
    pub fn project(&self, coord: Coord<f64>) -> Pos2 {
        let ppd = self.pixels_per_degree();
        let origin = self.viewport_center();
        Pos2::new(
            origin.x + ((coord.x - self.center.x) * ppd) as f32,
            origin.y - ((coord.y - self.center.y) * ppd) as f32,
        )
    }

    /// Lon/lat coordinate under a screen position
    pub fn unproject(&self, pos: Pos2) -> Coord<f64> {
        let ppd = self.pixels_per_degree();
        let origin = self.viewport_center();
        Coord {
            x: self.center.x + f64::from(pos.x - origin.x) / ppd,
            y: self.center.y - f64::from(pos.y - origin.y) / ppd,
        }
    }

    /// Pan with drags and zoom around the pointer with the scroll wheel.
    ///
    /// Secondary and middle drags always pan; primary drags only pan when
    /// `pan_with_primary` is set, i.e. while no drawing tool is active.
    pub fn handle_navigation(&mut self, response: &Response, scroll: Vec2, pan_with_primary: bool) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
            || (pan_with_primary && response.dragged_by(egui::PointerButton::Primary))
        {
            let delta = response.drag_delta();
            let ppd = self.pixels_per_degree();
            self.center.x -= f64::from(delta.x) / ppd;
            self.center.y += f64::from(delta.y) / ppd;
        }

        if scroll.y != 0.0 {
            if let Some(pointer) = response.hover_pos() {
                let anchor = self.unproject(pointer);
                self.zoom = (self.zoom + f64::from(scroll.y) / 200.0).clamp(MIN_ZOOM, MAX_ZOOM);
                // Keep the coordinate under the pointer in place.
                let moved = self.unproject(pointer);
                self.center.x += anchor.x - moved.x;
                self.center.y += anchor.y - moved.y;
            }
        }
    }

    fn fit_bounds(&mut self, rect: Rect, bounds: geo::Rect<f64>, padding: f32) {
        self.center = bounds.center();
        let width = f64::from((rect.width() - 2.0 * padding).max(1.0));
        let height = f64::from((rect.height() - 2.0 * padding).max(1.0));
        if bounds.width() <= 0.0 && bounds.height() <= 0.0 {
            self.zoom = POINT_ZOOM;
            return;
        }
        let ppd = (width / bounds.width()).min(height / bounds.height());
        self.zoom = (ppd * 360.0 / 256.0).log2().clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn shape_color(&self, shape: &Shape, spec: &LayerSpec) -> Color32 {
        shape
            .color_attribute()
            .or(Some(spec.default_color.as_str()))
            .and_then(|hex| Color32::from_hex(hex).ok())
            .unwrap_or(self.default_color)
    }

    /// Draw every registered layer, in the order they were added.
    pub fn paint(&self, painter: &Painter) {
        for (_, spec) in &self.layers {
            let Some(shapes) = self.sources.get(&spec.source) else {
                continue;
            };
            for shape in shapes.iter().filter(|s| s.geometry.kind() == spec.kind.geometry()) {
                let color = self.shape_color(shape, spec);
                self.paint_shape(painter, shape, spec.kind, color);
            }
        }
    }

    /// Draw shapes that are not part of any data source, e.g. drawings.
    pub fn paint_overlay(&self, painter: &Painter, shapes: &[Shape], color: Color32) {
        for shape in shapes {
            let kind = match shape.geometry.kind() {
                GeometryKind::Point => LayerKind::Bubble,
                GeometryKind::LineString => LayerKind::Line,
                GeometryKind::Polygon => LayerKind::Polygon,
            };
            self.paint_shape(painter, shape, kind, color);
        }
    }

    fn paint_shape(&self, painter: &Painter, shape: &Shape, kind: LayerKind, color: Color32) {
        let stroke = Stroke::new(self.line_width, color);
        match (&shape.geometry, kind) {
            (ShapeGeometry::Point(c), LayerKind::Bubble) => {
                painter.circle_filled(self.project(*c), self.point_radius, color);
            }
            (ShapeGeometry::Circle { center, radius }, LayerKind::Bubble) => {
                let pixels = (radius / METERS_PER_DEGREE * self.pixels_per_degree()) as f32;
                let fill = Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), POLYGON_FILL_ALPHA);
                painter.circle(self.project(*center), pixels.max(self.point_radius), fill, stroke);
            }
            (ShapeGeometry::LineString(line), LayerKind::Line) => {
                painter.line(self.project_line(line), stroke);
            }
            (ShapeGeometry::Polygon(polygon), LayerKind::Polygon) => {
                let exterior = self.project_line(polygon.exterior());
                if polygon.exterior().is_convex() && exterior.len() > 2 {
                    let fill = Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), POLYGON_FILL_ALPHA);
                    painter.add(egui::Shape::convex_polygon(exterior.clone(), fill, Stroke::NONE));
                }
                painter.add(egui::Shape::closed_line(exterior, stroke));
                for ring in polygon.interiors() {
                    painter.add(egui::Shape::closed_line(self.project_line(ring), stroke));
                }
            }
            _ => {}
        }
    }

    fn project_line(&self, line: &LineString<f64>) -> Vec<Pos2> {
        line.coords().map(|c| self.project(*c)).collect()
    }
}

impl RenderSurface for CanvasSurface {
    fn is_ready(&self) -> bool {
        self.viewport.is_some()
    }

    fn set_source(&mut self, source: DatasetId, shapes: &[Shape]) -> Result<(), RenderError> {
        if !self.is_ready() {
            return Err(RenderError::NotReady);
        }
        self.sources.insert(source, shapes.to_vec());
        Ok(())
    }

    fn remove_source(&mut self, source: DatasetId) {
        self.sources.remove(&source);
    }

    fn add_layer(&mut self, spec: LayerSpec) -> Result<LayerId, RenderError> {
        if !self.is_ready() {
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
        Ok(())
    }

    fn set_camera(&mut self, camera: CameraOptions) {
        let Some(rect) = self.viewport else {
            self.pending_camera = Some(camera);
            return;
        };
        if let Some(bounds) = camera.bounds {
            self.fit_bounds(rect, bounds, camera.padding);
        }
        if let Some(center) = camera.center {
            self.center = center;
        }
        if let Some(zoom) = camera.zoom {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    fn shapes_at(&self, position: Pos2) -> Vec<Shape> {
        let target = self.unproject(position);
        let tolerance = HIT_TOLERANCE_PX / self.pixels_per_degree();
        self.layers
            .iter()
            .rev()
            .filter_map(|(_, spec)| Some((spec, self.sources.get(&spec.source)?)))
            .flat_map(|(spec, shapes)| {
                shapes
                    .iter()
                    .filter(move |s| s.geometry.kind() == spec.kind.geometry())
            })
            .filter(|s| hit_testing::hits(s, target, tolerance))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    fn ready_canvas() -> CanvasSurface {
        let mut canvas = CanvasSurface::new(&ViewerConfig::default());
        canvas.set_viewport(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)));
        canvas
    }

    #[test]
    fn test_not_ready_before_viewport() {
        let mut canvas = CanvasSurface::new(&ViewerConfig::default());
        assert!(!canvas.is_ready());
        let spec = LayerSpec::new(DatasetId::new(), LayerKind::Line, "#000000");
        assert_eq!(canvas.add_layer(spec), Err(RenderError::NotReady));
    }

    #[test]
    fn test_project_unproject_inverse() {
        let canvas = ready_canvas();
        let coord = coord! { x: 12.5, y: -7.25 };
        let back = canvas.unproject(canvas.project(coord));
        assert!((back.x - coord.x).abs() < 1e-3);
        assert!((back.y - coord.y).abs() < 1e-3);
    }

    #[test]
    fn test_fit_centers_on_bounds() {
        let mut canvas = ready_canvas();
        let bounds = geo::Rect::new(coord! { x: 10.0, y: 40.0 }, coord! { x: 12.0, y: 42.0 });
        canvas.set_camera(CameraOptions::fit(bounds, 40.0));

        assert_eq!(canvas.center(), coord! { x: 11.0, y: 41.0 });
        let corner = canvas.project(coord! { x: 12.0, y: 42.0 });
        assert!(corner.x <= 760.5 && corner.y >= 39.5, "corner at {corner:?}");
    }

    #[test]
    fn test_camera_before_viewport_is_applied_later() {
        let mut canvas = CanvasSurface::new(&ViewerConfig::default());
        canvas.set_camera(CameraOptions::center_zoom(coord! { x: 5.0, y: 6.0 }, 9.0));
        canvas.set_viewport(Rect::from_min_size(Pos2::ZERO, Vec2::new(100.0, 100.0)));
        assert_eq!(canvas.center(), coord! { x: 5.0, y: 6.0 });
        assert_eq!(canvas.zoom(), 9.0);
    }
}
