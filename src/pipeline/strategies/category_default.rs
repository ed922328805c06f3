use super::{ColorStrategy, StageAttempt};
use crate::error::ClassifierError;
use crate::pipeline::context::{CategorizedState, RequestContext};
use crate::pipeline::domain::{ColorCandidate, SourceMethod, StageDetails};
use async_trait::async_trait;

/// Terminal tier: the category's typical color, or `unknown`.
#[derive(Debug, Clone, Copy)]
pub struct CategoryDefaultStrategy {
    confidence: f32,
}

impl CategoryDefaultStrategy {
    pub fn new(confidence: f32) -> Self {
        Self { confidence }
    }
}

#[async_trait]
impl ColorStrategy for CategoryDefaultStrategy {
    fn stage(&self) -> SourceMethod {
        SourceMethod::CategoryDefault
    }

    fn name(&self) -> &str {
        "category-default"
    }

    async fn attempt(
        &self,
        context: &RequestContext<CategorizedState>,
    ) -> Result<StageAttempt, ClassifierError> {
        let category = context.category();
        let candidate = match category.default_color() {
            Some(color) => ColorCandidate::new(color, self.confidence, SourceMethod::CategoryDefault),
            None => ColorCandidate::unknown(SourceMethod::CategoryDefault),
        };
        Ok(StageAttempt::succeeded(
            vec![candidate],
            StageDetails::CategoryDefault { category },
        ))
    }
}
