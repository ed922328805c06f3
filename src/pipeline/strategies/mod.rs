pub mod category_default;
pub mod direct;
pub mod ensemble;
pub mod pixel;
pub mod rule;

use crate::error::ClassifierError;
use crate::pipeline::context::{CategorizedState, RequestContext};
use crate::pipeline::domain::{sort_candidates, ColorCandidate, SourceMethod, StageDetails, StageOutcome};
use async_trait::async_trait;

pub use category_default::CategoryDefaultStrategy;
pub use direct::{extract_direct_colors, DirectStrategy};
pub use ensemble::EnsembleStrategy;
pub use pixel::PixelStrategy;
pub use rule::RuleStrategy;

/// What one cascade stage produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StageAttempt {
    pub outcome: StageOutcome,
    /// Sorted by descending confidence.
    pub candidates: Vec<ColorCandidate>,
    pub reason: Option<String>,
    pub details: StageDetails,
}

impl StageAttempt {
    pub fn succeeded(mut candidates: Vec<ColorCandidate>, details: StageDetails) -> Self {
        sort_candidates(&mut candidates);
        Self {
            outcome: StageOutcome::Succeeded,
            candidates,
            reason: None,
            details,
        }
    }

    pub fn no_answer(
        reason: impl Into<String>,
        mut candidates: Vec<ColorCandidate>,
        details: StageDetails,
    ) -> Self {
        sort_candidates(&mut candidates);
        Self {
            outcome: StageOutcome::NoAnswer,
            candidates,
            reason: Some(reason.into()),
            details,
        }
    }

    pub fn failed(reason: impl Into<String>, details: StageDetails) -> Self {
        Self {
            outcome: StageOutcome::Failed,
            candidates: Vec::new(),
            reason: Some(reason.into()),
            details,
        }
    }

    pub fn is_answer(&self) -> bool {
        self.outcome == StageOutcome::Succeeded && !self.candidates.is_empty()
    }
}

/// One tier of the color fallback cascade.
///
/// A recoverable `Err` (provider unavailable or malformed) marks the stage as
/// failed and the cascade moves on; terminal errors abort the request.
#[async_trait]
pub trait ColorStrategy: Send + Sync {
    fn stage(&self) -> SourceMethod;

    fn name(&self) -> &str;

    async fn attempt(
        &self,
        context: &RequestContext<CategorizedState>,
    ) -> Result<StageAttempt, ClassifierError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::common::image_source::{ImagePayload, ResolvedImage};
    use crate::common::labels::{DetectedObject, ScoredLabel};
    use crate::pipeline::context::{CategorizedState, RequestContext};
    use crate::pipeline::domain::CategoryTrace;
    use crate::taxonomy::{CategoryMatcher, RuleTable};
    use image::RgbImage;
    use std::sync::Arc;

    pub(crate) fn context_with(
        labels: Vec<ScoredLabel>,
        objects: Vec<DetectedObject>,
        pixels: Option<RgbImage>,
        rules: &RuleTable,
    ) -> RequestContext<CategorizedState> {
        let image = ResolvedImage::new(ImagePayload::Encoded(Arc::from(vec![0u8; 4])), pixels);
        let evaluation = rules.evaluate(&labels);
        let matched = CategoryMatcher::default().match_with(&labels, &evaluation);
        let mut trace = CategoryTrace::without_provider(matched);
        trace.labels = labels;
        trace.objects = objects;
        trace.rules = evaluation;
        RequestContext::new(image, "bytes").into_categorized(trace)
    }
}
