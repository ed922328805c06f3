use crate::common::labels::{sort_labels, ScoredLabel};
use crate::pipeline::domain::{sort_candidates, ColorCandidate, SourceMethod};
use crate::taxonomy::{Category, Color, ColorTaxonomy};
use indexmap::IndexMap;

/// Aggregated outcome of one ensemble round.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleVote {
    /// Sorted by descending confidence; never empty.
    pub candidates: Vec<ColorCandidate>,
    /// Normalized totals in first-vote order.
    pub votes: IndexMap<Color, f32>,
    /// No provider named a color; the candidates come from the category default.
    pub used_default: bool,
}

impl EnsembleVote {
    pub fn top(&self) -> Option<&ColorCandidate> {
        self.candidates.first()
    }
}

/// Rank-weighted color voting across independent classifiers.
#[derive(Debug, Clone, Copy)]
pub struct EnsembleVoter {
    taxonomy: &'static ColorTaxonomy,
    default_confidence: f32,
}

impl Default for EnsembleVoter {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl EnsembleVoter {
    pub fn new(default_confidence: f32) -> Self {
        Self {
            taxonomy: ColorTaxonomy::standard(),
            default_confidence,
        }
    }

    /// `results` holds one label list per provider that answered; `attempted`
    /// counts every provider asked, so silent failures dilute nobody's votes
    /// but still lower the overall confidence.
    pub fn vote(
        &self,
        results: &[Vec<ScoredLabel>],
        attempted: usize,
        category: Category,
    ) -> EnsembleVote {
        let mut votes: IndexMap<Color, f32> = IndexMap::new();

        for labels in results {
            let mut ranked = labels.clone();
            sort_labels(&mut ranked);

            let tokens = ranked
                .iter()
                .flat_map(|l| tokenize(&l.label))
                .map(|word| self.taxonomy.normalize(word))
                .filter(|color| *color != Color::Unknown);
            for (rank, color) in tokens.enumerate() {
                *votes.entry(color).or_insert(0.0) += 1.0 / (rank as f32 + 1.0);
            }
        }

        let divisor = attempted.max(results.len()).max(1) as f32;
        for total in votes.values_mut() {
            *total = (*total / divisor).min(1.0);
        }

        if votes.is_empty() {
            let candidate = match category.default_color() {
                Some(color) => ColorCandidate::new(
                    color,
                    self.default_confidence,
                    SourceMethod::CategoryDefault,
                ),
                None => ColorCandidate::unknown(SourceMethod::CategoryDefault),
            };
            return EnsembleVote {
                candidates: vec![candidate],
                votes,
                used_default: true,
            };
        }

        let mut candidates: Vec<ColorCandidate> = votes
            .iter()
            .map(|(color, total)| ColorCandidate::new(*color, *total, SourceMethod::Ensemble))
            .collect();
        sort_candidates(&mut candidates);

        EnsembleVote {
            candidates,
            votes,
            used_default: false,
        }
    }
}

/// Words of a label; hyphenated compounds stay whole.
pub fn tokenize(label: &str) -> impl Iterator<Item = &str> {
    label
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: &[(&str, f32)]) -> Vec<ScoredLabel> {
        raw.iter().map(|(l, s)| ScoredLabel::new(*l, *s)).collect()
    }

    #[test]
    fn tokenizer_keeps_hyphenated_words() {
        let words: Vec<_> = tokenize("navy-blue jersey, T-shirt").collect();
        assert_eq!(words, vec!["navy-blue", "jersey", "T-shirt"]);
    }

    #[test]
    fn earlier_tokens_weigh_more() {
        let voter = EnsembleVoter::default();
        let results = vec![labels(&[("red velvet", 0.9), ("blue jean", 0.2)])];
        let vote = voter.vote(&results, 1, Category::Other);

        assert!(!vote.used_default);
        assert_eq!(vote.votes[&Color::Red], 1.0);
        assert_eq!(vote.votes[&Color::Blue], 0.5);
        assert_eq!(vote.top().unwrap().name, Color::Red);
        assert_eq!(vote.top().unwrap().source_method, SourceMethod::Ensemble);
    }

    #[test]
    fn totals_are_divided_by_attempted_providers() {
        let voter = EnsembleVoter::default();
        let results = vec![
            labels(&[("green apple", 0.8)]),
            labels(&[("green tea", 0.5)]),
        ];
        let vote = voter.vote(&results, 4, Category::Other);
        assert!((vote.votes[&Color::Green] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn totals_are_clamped_to_one() {
        let voter = EnsembleVoter::default();
        let results = vec![labels(&[("black", 0.9), ("black", 0.8), ("black", 0.7)])];
        let vote = voter.vote(&results, 1, Category::Other);
        assert_eq!(vote.votes[&Color::Black], 1.0);
    }

    #[test]
    fn candidates_are_sorted_descending() {
        let voter = EnsembleVoter::default();
        let results = vec![
            labels(&[("pink", 0.9), ("white", 0.8)]),
            labels(&[("white", 0.7)]),
        ];
        let vote = voter.vote(&results, 2, Category::Other);
        let names: Vec<_> = vote.candidates.iter().map(|c| c.name).collect();
        assert_eq!(names, vec![Color::White, Color::Pink]);
        assert!(vote
            .candidates
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn empty_vote_falls_back_to_category_default() {
        let voter = EnsembleVoter::new(0.2);
        let results = vec![labels(&[("Loafer", 0.9)])];

        let vote = voter.vote(&results, 1, Category::Jeans);
        assert!(vote.used_default);
        assert!(vote.votes.is_empty());
        assert_eq!(vote.candidates[0].name, Color::Blue);
        assert_eq!(vote.candidates[0].source_method, SourceMethod::CategoryDefault);
        assert_eq!(vote.candidates[0].confidence, 0.2);

        let vote = voter.vote(&[], 3, Category::Kitchen);
        assert_eq!(vote.candidates[0].name, Color::Unknown);
        assert_eq!(vote.candidates[0].confidence, 0.0);
    }
}
