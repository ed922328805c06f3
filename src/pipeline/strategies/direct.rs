use super::{ColorStrategy, StageAttempt};
use crate::common::labels::{sort_labels, ScoredLabel};
use crate::error::ClassifierError;
use crate::pipeline::context::{CategorizedState, RequestContext};
use crate::pipeline::domain::{sort_candidates, ColorCandidate, SourceMethod, StageDetails};
use crate::pipeline::providers::ProviderHandle;
use crate::pipeline::voting::tokenize;
use crate::taxonomy::{CategoryTaxonomy, Color, ColorTaxonomy};
use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::debug;

const SYNONYM_FACTOR: f32 = 0.9;
const GARMENT_PHRASE_BOOST: f32 = 1.1;
const MATERIAL_FACTOR: f32 = 0.7;

static MATERIAL_HINTS: &[(&str, Color)] = &[
    ("denim", Color::Blue),
    ("jeans", Color::Blue),
    ("jean", Color::Blue),
    ("leather", Color::Brown),
];

/// Single fast-path provider call; colors are read straight off its labels.
pub struct DirectStrategy {
    provider: ProviderHandle,
    min_confidence: f32,
}

impl DirectStrategy {
    pub fn new(provider: ProviderHandle, min_confidence: f32) -> Self {
        Self {
            provider,
            min_confidence,
        }
    }
}

/// Color candidates named by a label list, best first.
///
/// Canonical color words keep the label score and synonyms are discounted.
/// A color directly followed by a garment word ("red dress") is boosted.
/// Material hints only count when no label names a color at all.
pub fn extract_direct_colors(labels: &[ScoredLabel]) -> Vec<ColorCandidate> {
    let colors = ColorTaxonomy::standard();
    let garments = CategoryTaxonomy::standard();

    let mut ranked = labels.to_vec();
    sort_labels(&mut ranked);

    let mut best: IndexMap<Color, f32> = IndexMap::new();
    let mut materials: IndexMap<Color, f32> = IndexMap::new();

    for label in &ranked {
        let lowered = label.label.to_lowercase();
        let words: Vec<&str> = tokenize(&lowered).collect();

        for (i, word) in words.iter().enumerate() {
            let (color, mut score) = match Color::from_name(word).filter(|c| c.is_known()) {
                Some(color) => (color, label.score),
                None => match colors.normalize(word) {
                    Color::Unknown => {
                        if let Some((_, color)) = MATERIAL_HINTS.iter().find(|(m, _)| m == word) {
                            let entry = materials.entry(*color).or_insert(0.0);
                            *entry = entry.max(label.score * MATERIAL_FACTOR);
                        }
                        continue;
                    }
                    color => (color, label.score * SYNONYM_FACTOR),
                },
            };

            let followed_by_garment = words
                .get(i + 1)
                .is_some_and(|next| garments.find_group(next).is_some());
            if followed_by_garment {
                score = (score * GARMENT_PHRASE_BOOST).min(1.0);
            }

            let entry = best.entry(color).or_insert(0.0);
            *entry = entry.max(score);
        }
    }

    let source = if best.is_empty() { materials } else { best };
    let mut candidates: Vec<ColorCandidate> = source
        .into_iter()
        .map(|(color, score)| ColorCandidate::new(color, score, SourceMethod::Direct))
        .collect();
    sort_candidates(&mut candidates);
    candidates
}

#[async_trait]
impl ColorStrategy for DirectStrategy {
    fn stage(&self) -> SourceMethod {
        SourceMethod::Direct
    }

    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn attempt(
        &self,
        context: &RequestContext<CategorizedState>,
    ) -> Result<StageAttempt, ClassifierError> {
        let labels = self.provider.labels(context.image()).await?;
        let candidates = extract_direct_colors(&labels);
        debug!(
            provider = %self.provider.name(),
            labels = labels.len(),
            candidates = candidates.len(),
            "Direct color extraction"
        );

        let details = StageDetails::Direct {
            provider: self.provider.name().to_string(),
            labels,
        };

        match candidates.first() {
            None => Ok(StageAttempt::no_answer(
                "no color words in provider labels",
                candidates,
                details,
            )),
            Some(top) if top.confidence < self.min_confidence => {
                let reason = format!(
                    "top candidate {} at {:.2} is below {:.2}",
                    top.name, top.confidence, self.min_confidence
                );
                Ok(StageAttempt::no_answer(reason, candidates, details))
            }
            Some(_) => Ok(StageAttempt::succeeded(candidates, details)),
        }
    }
}
