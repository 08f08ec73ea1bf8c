use crate::measurement::{self, Measurement};
use crate::shape::{Shape, ShapeId};

/// Lifecycle events of a shape being drawn or edited
#[derive(Debug, Clone, PartialEq)]
pub enum DrawingEvent {
    /// The shape is still being drawn
    Changing(Shape),
    /// An existing shape was edited
    Changed(Shape),
    /// The shape was finished
    Complete(Shape),
}

impl DrawingEvent {
    pub fn shape(&self) -> &Shape {
        match self {
            Self::Changing(shape) | Self::Changed(shape) | Self::Complete(shape) => shape,
        }
    }

    pub fn into_shape(self) -> Shape {
        match self {
            Self::Changing(shape) | Self::Changed(shape) | Self::Complete(shape) => shape,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// Measures each drawn shape and keeps only the most recent readout.
#[derive(Debug, Clone, Default)]
pub struct DrawingSession {
    latest: Option<(ShapeId, Measurement)>,
    completed: Vec<Shape>,
}

impl DrawingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure the event's shape and publish the result.
    ///
    /// A shape that cannot be measured clears the readout instead of leaving
    /// an older shape's numbers on screen.
    pub fn handle(&mut self, event: DrawingEvent) -> Option<Measurement> {
        let shape = event.shape();
        self.latest = match measurement::measure(shape) {
            Ok(measurement) => Some((shape.id, measurement)),
            Err(err) => {
                log::debug!("No measurement for drawn shape {}: {}", shape.id, err);
                None
            }
        };

        if event.is_complete() {
            let shape = event.into_shape();
            self.completed.retain(|s| s.id != shape.id);
            self.completed.push(shape);
        } else if let DrawingEvent::Changed(shape) = event {
            if let Some(existing) = self.completed.iter_mut().find(|s| s.id == shape.id) {
                *existing = shape;
            }
        }
        self.latest()
    }

    pub fn latest(&self) -> Option<Measurement> {
        self.latest.map(|(_, measurement)| measurement)
    }

    /// Id of the shape the latest readout belongs to
    pub fn latest_shape(&self) -> Option<ShapeId> {
        self.latest.map(|(id, _)| id)
    }

    /// Shapes finished in this session, in completion order
    pub fn completed(&self) -> &[Shape] {
        &self.completed
    }

    /// Delete a finished shape. Clears the readout if it belonged to it.
    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        let index = self.completed.iter().position(|s| s.id == id)?;
        if self.latest_shape() == Some(id) {
            self.latest = None;
        }
        Some(self.completed.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Properties, ShapeGeometry};
    use geo::{LineString, coord};

    fn line(coords: Vec<(f64, f64)>) -> Shape {
        Shape::new(ShapeGeometry::LineString(LineString::from(coords)), Properties::new())
    }

    #[test]
    fn test_only_latest_measurement_is_kept() {
        let mut session = DrawingSession::new();
        session.handle(DrawingEvent::Complete(Shape::circle(coord! { x: 0.0, y: 0.0 }, 1.0)));
        let latest = session.handle(DrawingEvent::Changing(line(vec![(0.0, 0.0), (0.0, 0.0)])));

        assert_eq!(latest, Some(Measurement::Line { length: 0.0 }));
        assert_eq!(session.latest(), latest);
        assert_eq!(session.completed().len(), 1);
    }

    #[test]
    fn test_unmeasurable_shape_clears_readout() {
        let mut session = DrawingSession::new();
        session.handle(DrawingEvent::Complete(Shape::circle(coord! { x: 0.0, y: 0.0 }, 1.0)));
        let latest = session.handle(DrawingEvent::Changing(line(vec![])));

        assert_eq!(latest, None);
        assert_eq!(session.latest(), None);
    }

    #[test]
    fn test_changed_replaces_completed_shape() {
        let mut session = DrawingSession::new();
        let mut shape = line(vec![(0.0, 0.0), (1.0, 0.0)]);
        session.handle(DrawingEvent::Complete(shape.clone()));

        shape.geometry = ShapeGeometry::LineString(LineString::from(vec![(0.0, 0.0), (2.0, 0.0)]));
        session.handle(DrawingEvent::Changed(shape.clone()));

        assert_eq!(session.completed(), &[shape]);
    }

    #[test]
    fn test_remove_clears_its_readout() {
        let mut session = DrawingSession::new();
        let circle = Shape::circle(coord! { x: 0.0, y: 0.0 }, 2.0);
        let id = circle.id;
        session.handle(DrawingEvent::Complete(circle));

        assert!(session.remove(id).is_some());
        assert!(session.latest().is_none());
        assert!(session.completed().is_empty());
    }
}
