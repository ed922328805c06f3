use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single ranked label returned by an inference provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub label: String,
    pub score: f32,
}

impl ScoredLabel {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Axis-aligned box in normalized [0,1] image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl BoundingBox {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn full() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn center_half() -> Self {
        Self::new(0.25, 0.25, 0.75, 0.75)
    }

    /// Clamp to the unit square; `None` when nothing of positive area remains.
    pub fn clamped(&self) -> Option<Self> {
        let clamp = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        let (x0, x1) = (clamp(self.xmin), clamp(self.xmax));
        let (y0, y1) = (clamp(self.ymin), clamp(self.ymax));
        if x1 > x0 && y1 > y0 {
            Some(Self::new(x0, y0, x1, y1))
        } else {
            None
        }
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub label: String,
    pub score: f32,
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
}

impl DetectedObject {
    pub fn new(label: impl Into<String>, score: f32, bounding_box: BoundingBox) -> Self {
        Self {
            label: label.into(),
            score,
            bounding_box,
        }
    }

    pub fn as_label(&self) -> ScoredLabel {
        ScoredLabel::new(self.label.clone(), self.score)
    }
}

fn descending(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Stable descending sort; equal scores keep their provider order.
pub fn sort_labels(labels: &mut [ScoredLabel]) {
    labels.sort_by(|a, b| descending(a.score, b.score));
}

pub fn sort_objects(objects: &mut [DetectedObject]) {
    objects.sort_by(|a, b| descending(a.score, b.score));
}
