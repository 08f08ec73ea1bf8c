use egui::Color32;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::dataset::DatasetCollection;
use crate::shape::Shape;

/// Color used for shapes whose value has no assignment
pub const DEFAULT_COLOR: Color32 = Color32::BLACK;

/// Format a color as `#rrggbb`, the form stored in the `color` attribute.
pub fn to_hex(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}

/// String form of a property value used for matching and legend entries.
///
/// Strings are used verbatim, other JSON values by their JSON text. `null`
/// has no key.
pub fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Distinct values of `property` across every loaded shape, in the order
/// they are first observed.
pub fn values_for(datasets: &DatasetCollection, property: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    datasets
        .shapes()
        .filter_map(|shape| shape.property(property).and_then(value_key))
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Mapping from a property value to the color picked for it.
///
/// Entries are only ever added or updated by explicit picks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorAssignment {
    colors: HashMap<String, Color32>,
}

impl ColorAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update the color of `value`
    pub fn set(&mut self, value: impl Into<String>, color: Color32) {
        self.colors.insert(value.into(), color);
    }

    pub fn get(&self, value: &str) -> Option<Color32> {
        self.colors.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Styles shapes by the value of one chosen property.
#[derive(Debug, Clone)]
pub struct PropertyColorAssigner {
    selected: Option<String>,
    values: Vec<String>,
    assignment: ColorAssignment,
    default_color: Color32,
}

impl Default for PropertyColorAssigner {
    fn default() -> Self {
        Self::new(DEFAULT_COLOR)
    }
}

impl PropertyColorAssigner {
    pub fn new(default_color: Color32) -> Self {
        Self {
            selected: None,
            values: Vec::new(),
            assignment: ColorAssignment::new(),
            default_color,
        }
    }

    pub fn selected_property(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Distinct values of the selected property, empty when none is selected
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn assignment(&self) -> &ColorAssignment {
        &self.assignment
    }

    pub fn default_color(&self) -> Color32 {
        self.default_color
    }

    /// Select the property to style by and recompute its distinct values.
    pub fn select_property(&mut self, name: &str, datasets: &DatasetCollection) -> &[String] {
        log::info!("Selected property: {}", name);
        self.selected = Some(name.to_owned());
        self.refresh_values(datasets);
        &self.values
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.values.clear();
    }

    /// Recompute the values of the selected property, e.g. after an upload.
    pub fn refresh_values(&mut self, datasets: &DatasetCollection) {
        self.values = match &self.selected {
            Some(property) => values_for(datasets, property),
            None => Vec::new(),
        };
    }

    /// Assign `color` to `value` and write it onto every matching shape.
    ///
    /// Shapes whose selected-property value equals `value` get their `color`
    /// attribute replaced immediately. Returns how many shapes were updated.
    pub fn assign_color(
        &mut self,
        value: &str,
        color: Color32,
        datasets: &mut DatasetCollection,
    ) -> usize {
        self.assignment.set(value, color);

        let Some(property) = self.selected.as_deref() else {
            log::debug!("Color for {} stored, no property selected", value);
            return 0;
        };

        let hex = to_hex(color);
        let mut updated = 0;
        for dataset in datasets.iter_mut() {
            for shape in &mut dataset.shapes {
                let matches = shape
                    .property(property)
                    .and_then(value_key)
                    .is_some_and(|key| key == value);
                if matches {
                    shape.set_color_attribute(hex.clone());
                    updated += 1;
                }
            }
        }
        log::debug!("Assigned {} to {}={} on {} shapes", hex, property, value, updated);
        updated
    }

    /// The color a shape should render with. Does not touch the shape.
    pub fn color_for(&self, shape: &Shape) -> Color32 {
        self.selected
            .as_deref()
            .and_then(|property| shape.property(property))
            .and_then(value_key)
            .and_then(|key| self.assignment.get(&key))
            .unwrap_or(self.default_color)
    }
}
