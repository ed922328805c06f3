use super::{ColorStrategy, StageAttempt};
use crate::error::ClassifierError;
use crate::pipeline::analysis::PixelColorExtractor;
use crate::pipeline::context::{CategorizedState, RequestContext};
use crate::pipeline::domain::{ColorCandidate, SourceMethod, StageDetails};
use crate::taxonomy::Color;
use async_trait::async_trait;
use tracing::debug;

/// Deterministic estimate from the decoded pixels, focused on the top detection.
#[derive(Debug, Clone, Default)]
pub struct PixelStrategy {
    extractor: PixelColorExtractor,
}

impl PixelStrategy {
    pub fn new(extractor: PixelColorExtractor) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl ColorStrategy for PixelStrategy {
    fn stage(&self) -> SourceMethod {
        SourceMethod::Pixel
    }

    fn name(&self) -> &str {
        "pixel-analysis"
    }

    async fn attempt(
        &self,
        context: &RequestContext<CategorizedState>,
    ) -> Result<StageAttempt, ClassifierError> {
        let Some(pixels) = context.image().pixels() else {
            return Ok(StageAttempt::no_answer(
                "image was not decoded locally",
                Vec::new(),
                StageDetails::None,
            ));
        };

        let region = context.objects().first().map(|o| o.bounding_box);
        let estimate = self.extractor.extract_color(pixels, region);
        debug!(
            color = %estimate.color,
            confidence = estimate.confidence,
            roi = region.is_some(),
            "Pixel color estimated"
        );

        let candidate = ColorCandidate::new(estimate.color, estimate.confidence, SourceMethod::Pixel)
            .with_rgb(estimate.rgb_approx());
        let details = StageDetails::Pixel(estimate.analysis);

        if estimate.color == Color::Unknown {
            Ok(StageAttempt::no_answer(
                "no foreground pixels",
                vec![candidate],
                details,
            ))
        } else {
            Ok(StageAttempt::succeeded(vec![candidate], details))
        }
    }
}
