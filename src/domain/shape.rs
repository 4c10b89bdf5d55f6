// ============================================================
// Layer 3 - Shape Records and Predictions
// ============================================================
// Plain data passed between layers: where a mesh lives on disk
// and which class it belongs to, the catalogue produced by a
// directory scan, and one ranked prediction.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::label_map::LabelMap;

/// One mesh file and its class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeRecord {
    /// Path to model_normalized.obj
    pub path: PathBuf,

    /// Category directory name (e.g. "02691156")
    pub category: String,

    /// Index of `category` in the label map
    pub label: usize,
}

/// Result of scanning a data root.
#[derive(Debug, Clone)]
pub struct ShapeCatalog {
    pub label_map: LabelMap,
    pub records:   Vec<ShapeRecord>,
}

impl ShapeCatalog {
    /// Number of records per class index.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.label_map.len()];
        for r in &self.records {
            if let Some(c) = counts.get_mut(r.label) {
                *c += 1;
            }
        }
        counts
    }
}

/// One entry of a ranked classification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label:       usize,
    pub category:    String,
    pub name:        String,
    pub probability: f32,
}
