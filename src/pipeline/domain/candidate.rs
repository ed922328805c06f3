use crate::taxonomy::Color;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Cascade stage that produced a color candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMethod {
    Rule,
    Direct,
    Ensemble,
    Pixel,
    CategoryDefault,
}

impl SourceMethod {
    pub fn name(&self) -> &'static str {
        match self {
            SourceMethod::Rule => "rule",
            SourceMethod::Direct => "direct",
            SourceMethod::Ensemble => "ensemble",
            SourceMethod::Pixel => "pixel",
            SourceMethod::CategoryDefault => "category_default",
        }
    }
}

impl fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorCandidate {
    pub name: Color,
    pub confidence: f32,
    pub rgb_approx: [u8; 3],
    pub source_method: SourceMethod,
}

impl ColorCandidate {
    /// Candidate with the color's representative swatch; confidence is clamped to [0, 1].
    pub fn new(name: Color, confidence: f32, source_method: SourceMethod) -> Self {
        Self {
            name,
            confidence: clamp_confidence(confidence),
            rgb_approx: name.approximate_rgb(),
            source_method,
        }
    }

    pub fn with_rgb(mut self, rgb: [u8; 3]) -> Self {
        self.rgb_approx = rgb;
        self
    }

    pub fn unknown(source_method: SourceMethod) -> Self {
        Self::new(Color::Unknown, 0.0, source_method)
    }
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Stable descending sort by confidence.
pub fn sort_candidates(candidates: &mut [ColorCandidate]) {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(
            ColorCandidate::new(Color::Red, 1.4, SourceMethod::Direct).confidence,
            1.0
        );
        assert_eq!(
            ColorCandidate::new(Color::Red, f32::NAN, SourceMethod::Direct).confidence,
            0.0
        );
    }

    #[test]
    fn sort_keeps_ties_in_input_order() {
        let mut candidates = vec![
            ColorCandidate::new(Color::Blue, 0.5, SourceMethod::Ensemble),
            ColorCandidate::new(Color::Red, 0.9, SourceMethod::Ensemble),
            ColorCandidate::new(Color::Green, 0.5, SourceMethod::Ensemble),
        ];
        sort_candidates(&mut candidates);
        let names: Vec<_> = candidates.iter().map(|c| c.name).collect();
        assert_eq!(names, vec![Color::Red, Color::Blue, Color::Green]);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(ColorCandidate::new(
            Color::Purple,
            0.8,
            SourceMethod::CategoryDefault,
        ))
        .unwrap();
        assert_eq!(json["name"], "purple");
        assert_eq!(json["sourceMethod"], "category_default");
        assert_eq!(json["rgbApprox"], serde_json::json!([128, 0, 128]));
    }
}
