use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// One predicted object instance.
///
/// Produced fresh per detector invocation and owned by the frame record that
/// contains it. Order within a frame is the detector's output order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    /// Class label (e.g. "person", "car")
    pub label: String,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
    /// Bounding box in pixel coordinates of the source frame
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }

    /// Label formatted the way the annotator renders it: `"{label} {confidence:.2}"`.
    pub fn display_label(&self) -> String {
        format!("{} {:.2}", self.label, self.confidence)
    }
}
