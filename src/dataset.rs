use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use crate::shape::Shape;

/// A unique identifier for a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub Uuid);

impl DatasetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DatasetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shapes originating from one uploaded file
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub id: DatasetId,
    /// Display name, the uploaded file name
    pub name: String,
    pub shapes: Vec<Shape>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, shapes: Vec<Shape>) -> Self {
        Self {
            id: DatasetId::new(),
            name: name.into(),
            shapes,
        }
    }

    /// Bounding extent of every coordinate, or `None` when there are none
    pub fn extent(&self) -> Option<Rect<f64>> {
        let mut coords = self.shapes.iter().flat_map(|shape| shape.geometry.coords());
        let first = coords.next()?;
        let (min, max) = coords.fold((first, first), |(min, max), c| {
            (
                Coord { x: min.x.min(c.x), y: min.y.min(c.y) },
                Coord { x: max.x.max(c.x), y: max.y.max(c.y) },
            )
        });
        Some(Rect::new(min, max))
    }
}

/// The datasets currently loaded, in upload order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetCollection {
    datasets: Vec<Dataset>,
}

impl DatasetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dataset unless one with the same name is already loaded.
    ///
    /// Returns the id of the added dataset, or `None` for a duplicate.
    pub fn insert(&mut self, dataset: Dataset) -> Option<DatasetId> {
        if self.contains_name(&dataset.name) {
            log::info!("Ignoring duplicate upload: {}", dataset.name);
            return None;
        }
        let id = dataset.id;
        log::debug!("Loaded dataset {} ({} shapes)", dataset.name, dataset.shapes.len());
        self.datasets.push(dataset);
        Some(id)
    }

    pub fn remove(&mut self, id: DatasetId) -> Option<Dataset> {
        let index = self.datasets.iter().position(|d| d.id == id)?;
        Some(self.datasets.remove(index))
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.datasets.iter().any(|d| d.name == name)
    }

    pub fn get(&self, id: DatasetId) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id == id)
    }

    pub fn get_mut(&mut self, id: DatasetId) -> Option<&mut Dataset> {
        self.datasets.iter_mut().find(|d| d.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Dataset> {
        self.datasets.iter_mut()
    }

    pub fn ids(&self) -> Vec<DatasetId> {
        self.datasets.iter().map(|d| d.id).collect()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Every shape across every dataset
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.datasets.iter().flat_map(|d| d.shapes.iter())
    }

    /// The union of attribute names across all shapes, in the order they are
    /// first observed.
    pub fn property_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for key in self.shapes().flat_map(|shape| shape.properties.keys()) {
            if seen.insert(key.as_str()) {
                names.push(key.clone());
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Properties, ShapeGeometry};
    use geo::coord;
    use serde_json::Value;

    fn point_with(keys: &[&str]) -> Shape {
        let mut properties = Properties::new();
        for key in keys {
            properties.insert((*key).to_owned(), Value::from(1));
        }
        Shape::new(ShapeGeometry::Point(coord! { x: 1.0, y: 2.0 }), properties)
    }

    #[test]
    fn test_duplicate_names_are_ignored() {
        let mut datasets = DatasetCollection::new();
        let first = datasets.insert(Dataset::new("parks.geojson", vec![point_with(&["a"])]));
        let second = datasets.insert(Dataset::new("parks.geojson", vec![]));

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets.get(first.unwrap()).unwrap().shapes.len(), 1);
    }

    #[test]
    fn test_property_names_in_first_observation_order() {
        let mut datasets = DatasetCollection::new();
        datasets.insert(Dataset::new("one", vec![point_with(&["zeta", "alpha"])]));
        datasets.insert(Dataset::new("two", vec![point_with(&["alpha", "mid"])]));

        assert_eq!(datasets.property_names(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_extent_covers_all_coordinates() {
        let dataset = Dataset::new(
            "lines",
            vec![
                Shape::new(ShapeGeometry::Point(coord! { x: -3.0, y: 1.0 }), Properties::new()),
                Shape::new(ShapeGeometry::Point(coord! { x: 5.0, y: -2.0 }), Properties::new()),
            ],
        );
        let extent = dataset.extent().unwrap();
        assert_eq!(extent.min(), coord! { x: -3.0, y: -2.0 });
        assert_eq!(extent.max(), coord! { x: 5.0, y: 1.0 });
    }

    #[test]
    fn test_empty_dataset_has_no_extent() {
        assert!(Dataset::new("empty", vec![]).extent().is_none());
    }
}
