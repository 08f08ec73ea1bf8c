use geo::{Coord, GeodesicDistance, LineString, Point, Polygon};
use serde_json::Value;

use crate::drawing::DrawingEvent;
use crate::input::InputEvent;
use crate::shape::{Properties, RADIUS_PROPERTY, Shape, ShapeGeometry, ShapeId};

/// Drawing modes offered by the toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTool {
    Line,
    Polygon,
    Circle,
}

impl DrawTool {
    pub const ALL: [DrawTool; 3] = [DrawTool::Line, DrawTool::Polygon, DrawTool::Circle];

    pub fn name(self) -> &'static str {
        match self {
            Self::Line => "Draw line",
            Self::Polygon => "Draw polygon",
            Self::Circle => "Draw circle",
        }
    }

    /// Vertices needed before a drawing can be finished
    fn min_vertices(self) -> usize {
        match self {
            Self::Line => 2,
            Self::Polygon => 3,
            Self::Circle => 1,
        }
    }
}

/// The shape currently being drawn
#[derive(Debug, Clone)]
struct InProgress {
    id: ShapeId,
    vertices: Vec<Coord<f64>>,
    cursor: Option<Coord<f64>>,
}

/// A finished shape whose vertices are being dragged
#[derive(Debug, Clone)]
struct Editing {
    shape: Shape,
    /// Vertex grabbed by the current drag
    vertex: Option<usize>,
}

/// Turns map input into drawing events for the active tool.
///
/// Lines and polygons are drawn by clicking vertices and finished with a
/// double click or Enter. Circles are dragged out from their center. A
/// finished drawing returns the toolbar to idle.
///
/// A finished shape can be edited afterwards: dragging moves the vertex
/// nearest to the press (a circle's edge sets its radius) and reports
/// [`DrawingEvent::Changed`]. Enter, Escape or a double click end editing.
#[derive(Debug, Clone, Default)]
pub struct DrawingToolbar {
    active: Option<DrawTool>,
    in_progress: Option<InProgress>,
    editing: Option<Editing>,
}

impl DrawingToolbar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_tool(&self) -> Option<DrawTool> {
        self.active
    }

    pub fn is_drawing(&self) -> bool {
        self.in_progress.is_some()
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Switch tools, dropping any unfinished drawing or edit
    pub fn set_active_tool(&mut self, tool: Option<DrawTool>) {
        if self.active != tool {
            log::debug!("Drawing tool changed: {:?} -> {:?}", self.active, tool);
        }
        self.active = tool;
        self.in_progress = None;
        self.editing = None;
    }

    /// Start editing a finished shape
    pub fn edit(&mut self, shape: Shape) {
        self.set_active_tool(None);
        log::debug!("Editing drawing {}", shape.id);
        self.editing = Some(Editing { shape, vertex: None });
    }

    pub fn stop_editing(&mut self) {
        self.editing = None;
    }

    /// Feed one input event. `unproject` maps screen positions to lon/lat.
    pub fn handle_input(
        &mut self,
        event: &InputEvent,
        unproject: impl Fn(egui::Pos2) -> Coord<f64>,
    ) -> Option<DrawingEvent> {
        if self.editing.is_some() {
            return self.handle_edit(event, unproject);
        }
        let tool = self.active?;
        match event {
            InputEvent::PointerDown { position } => self.on_pointer_down(tool, unproject(*position)),
            InputEvent::PointerMove { position, .. } => self.on_pointer_move(tool, unproject(*position)),
            InputEvent::PointerUp { position } => self.on_pointer_up(tool, unproject(*position)),
            InputEvent::DoubleClick { .. } | InputEvent::Finish => self.finish(),
            InputEvent::Cancel => {
                self.set_active_tool(None);
                None
            }
        }
    }

    fn handle_edit(
        &mut self,
        event: &InputEvent,
        unproject: impl Fn(egui::Pos2) -> Coord<f64>,
    ) -> Option<DrawingEvent> {
        let editing = self.editing.as_mut()?;
        match event {
            InputEvent::PointerDown { position } => {
                editing.vertex = nearest_vertex(&editing.shape.geometry, unproject(*position));
                None
            }
            InputEvent::PointerMove {
                position,
                primary_down: true,
            } => {
                let vertex = editing.vertex?;
                move_vertex(&mut editing.shape, vertex, unproject(*position));
                Some(DrawingEvent::Changed(editing.shape.clone()))
            }
            InputEvent::PointerMove { .. } => None,
            InputEvent::PointerUp { .. } => {
                editing.vertex = None;
                None
            }
            InputEvent::DoubleClick { .. } | InputEvent::Finish | InputEvent::Cancel => {
                log::debug!("Finished editing drawing {}", editing.shape.id);
                self.editing = None;
                None
            }
        }
    }

    fn on_pointer_down(&mut self, tool: DrawTool, at: Coord<f64>) -> Option<DrawingEvent> {
        let drawing = self.in_progress.get_or_insert_with(|| InProgress {
            id: ShapeId::new(),
            vertices: Vec::new(),
            cursor: None,
        });
        match tool {
            DrawTool::Circle => {
                drawing.vertices = vec![at];
                drawing.cursor = Some(at);
            }
            DrawTool::Line | DrawTool::Polygon => {
                // A double click lands two presses on the same spot.
                if drawing.vertices.last() != Some(&at) {
                    drawing.vertices.push(at);
                }
            }
        }
        self.preview(tool).map(DrawingEvent::Changing)
    }

    fn on_pointer_move(&mut self, tool: DrawTool, at: Coord<f64>) -> Option<DrawingEvent> {
        let drawing = self.in_progress.as_mut()?;
        drawing.cursor = Some(at);
        self.preview(tool).map(DrawingEvent::Changing)
    }

    fn on_pointer_up(&mut self, tool: DrawTool, at: Coord<f64>) -> Option<DrawingEvent> {
        if tool != DrawTool::Circle {
            return None;
        }
        self.in_progress.as_mut()?.cursor = Some(at);
        self.finish()
    }

    /// Complete the drawing if it has enough vertices
    pub fn finish(&mut self) -> Option<DrawingEvent> {
        let tool = self.active?;
        let drawing = self.in_progress.as_ref()?;
        if drawing.vertices.len() < tool.min_vertices() {
            return None;
        }
        let shape = self.build(tool, false)?;
        log::info!("Finished {:?} drawing {}", tool, shape.id);
        self.set_active_tool(None);
        Some(DrawingEvent::Complete(shape))
    }

    /// The shape as it would look now, including the cursor position
    pub fn preview(&self, tool: DrawTool) -> Option<Shape> {
        self.build(tool, true)
    }

    fn build(&self, tool: DrawTool, with_cursor: bool) -> Option<Shape> {
        let drawing = self.in_progress.as_ref()?;
        let mut shape = match tool {
            DrawTool::Circle => {
                let center = *drawing.vertices.first()?;
                let edge = drawing.cursor.unwrap_or(center);
                let radius = Point::from(center).geodesic_distance(&Point::from(edge));
                Shape::circle(center, radius)
            }
            DrawTool::Line | DrawTool::Polygon => {
                let mut vertices = drawing.vertices.clone();
                if with_cursor {
                    vertices.extend(drawing.cursor);
                }
                if vertices.is_empty() {
                    return None;
                }
                let line = LineString::new(vertices);
                let geometry = if tool == DrawTool::Polygon {
                    ShapeGeometry::Polygon(Polygon::new(line, vec![]))
                } else {
                    ShapeGeometry::LineString(line)
                };
                Shape::new(geometry, Properties::new())
            }
        };
        shape.id = drawing.id;
        Some(shape)
    }

    /// Shape to draw as a preview of the unfinished drawing
    pub fn current_preview(&self) -> Option<Shape> {
        self.preview(self.active?)
    }
}

/// Editable vertices of a geometry. A polygon's closing coordinate is not
/// its own vertex; a circle has a single handle on its edge.
fn vertices(geometry: &ShapeGeometry) -> &[Coord<f64>] {
    match geometry {
        ShapeGeometry::Point(c) => std::slice::from_ref(c),
        ShapeGeometry::Circle { .. } => &[],
        ShapeGeometry::LineString(line) => &line.0,
        ShapeGeometry::Polygon(polygon) => {
            let ring = &polygon.exterior().0;
            &ring[..ring.len().saturating_sub(1)]
        }
    }
}

fn nearest_vertex(geometry: &ShapeGeometry, at: Coord<f64>) -> Option<usize> {
    if let ShapeGeometry::Circle { .. } = geometry {
        return Some(0);
    }
    let distance = |c: &Coord<f64>| (c.x - at.x).powi(2) + (c.y - at.y).powi(2);
    vertices(geometry)
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| distance(*a).total_cmp(&distance(*b)))
        .map(|(index, _)| index)
}

fn move_vertex(shape: &mut Shape, index: usize, to: Coord<f64>) {
    match &mut shape.geometry {
        ShapeGeometry::Point(c) => *c = to,
        ShapeGeometry::Circle { center, radius } => {
            *radius = Point::from(*center).geodesic_distance(&Point::from(to));
            shape
                .properties
                .insert(RADIUS_PROPERTY.to_owned(), Value::from(*radius));
        }
        ShapeGeometry::LineString(line) => {
            if let Some(c) = line.0.get_mut(index) {
                *c = to;
            }
        }
        ShapeGeometry::Polygon(polygon) => polygon.exterior_mut(|ring| {
            let last = ring.0.len().saturating_sub(1);
            if let Some(c) = ring.0.get_mut(index) {
                *c = to;
            }
            // The closing coordinate follows the first vertex.
            if index == 0 && last > 0 {
                ring.0[last] = to;
            }
        }),
    }
}
