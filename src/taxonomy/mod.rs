pub mod category;
pub mod color;
pub mod rules;

pub use category::{Category, CategoryMatch, CategoryMatcher, CategoryTaxonomy, KeywordGroup};
pub use color::{normalize, Color, ColorBucket, ColorTaxonomy};
pub use rules::{OverrideRule, RuleEvaluation, RuleHit, RuleTable};

/// True when `needle` occurs in `haystack` at the start of a word, so
/// "dark-red" and "reddish" contain "red" but "colored" does not.
pub(crate) fn contains_at_word_start(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(i, _)| {
        haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}
