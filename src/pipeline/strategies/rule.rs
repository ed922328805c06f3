use super::{ColorStrategy, StageAttempt};
use crate::error::ClassifierError;
use crate::pipeline::context::{CategorizedState, RequestContext};
use crate::pipeline::domain::{ColorCandidate, SourceMethod, StageDetails};
use async_trait::async_trait;

/// Forced colors declared in the override rule table.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleStrategy;

impl RuleStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ColorStrategy for RuleStrategy {
    fn stage(&self) -> SourceMethod {
        SourceMethod::Rule
    }

    fn name(&self) -> &str {
        "override-rules"
    }

    async fn attempt(
        &self,
        context: &RequestContext<CategorizedState>,
    ) -> Result<StageAttempt, ClassifierError> {
        let Some(hit) = &context.rules().color else {
            return Ok(StageAttempt::no_answer(
                "no color rule matched",
                Vec::new(),
                StageDetails::None,
            ));
        };

        Ok(StageAttempt::succeeded(
            vec![ColorCandidate::new(hit.value, hit.confidence, SourceMethod::Rule)],
            StageDetails::Rule {
                rule: hit.rule.clone(),
                matched_label: hit.matched_label.clone(),
            },
        ))
    }
}
