use super::candidate::ColorCandidate;
use super::trace::DebugTrace;
use crate::taxonomy::{Category, Color};
use serde::Serialize;

/// The only value that leaves the classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub category: Category,
    pub color: Color,
    /// Confidence of the winning color candidate.
    pub confidence: f32,
    pub category_confidence: f32,
    /// Never empty; sorted by descending confidence.
    pub candidates: Vec<ColorCandidate>,
    pub object_detected: Option<String>,
    pub debug_trace: Option<DebugTrace>,
}

impl ClassificationResult {
    pub fn top_candidate(&self) -> Option<&ColorCandidate> {
        self.candidates.first()
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}
