use super::{ColorStrategy, StageAttempt};
use crate::error::ClassifierError;
use crate::pipeline::context::{CategorizedState, RequestContext};
use crate::pipeline::domain::{ProviderFailure, SourceMethod, StageDetails};
use crate::pipeline::providers::ProviderHandle;
use crate::pipeline::voting::EnsembleVoter;
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

/// Concurrent fan-out to several classifiers followed by rank-weighted voting.
pub struct EnsembleStrategy {
    providers: Vec<ProviderHandle>,
    voter: EnsembleVoter,
    min_confidence: f32,
}

impl EnsembleStrategy {
    pub fn new(providers: Vec<ProviderHandle>, voter: EnsembleVoter, min_confidence: f32) -> Self {
        Self {
            providers,
            voter,
            min_confidence,
        }
    }

    pub fn providers(&self) -> &[ProviderHandle] {
        &self.providers
    }
}

#[async_trait]
impl ColorStrategy for EnsembleStrategy {
    fn stage(&self) -> SourceMethod {
        SourceMethod::Ensemble
    }

    fn name(&self) -> &str {
        "ensemble"
    }

    async fn attempt(
        &self,
        context: &RequestContext<CategorizedState>,
    ) -> Result<StageAttempt, ClassifierError> {
        let image = context.image();
        let responses =
            join_all(self.providers.iter().map(|provider| provider.labels(image))).await;

        let attempted = self.providers.len();
        let mut results = Vec::with_capacity(attempted);
        let mut failures = Vec::new();
        for (provider, response) in self.providers.iter().zip(responses) {
            match response {
                Ok(labels) => results.push(labels),
                Err(e) if e.is_terminal() => return Err(e),
                Err(e) => {
                    warn!(provider = %provider.name(), error = %e, "Ensemble member failed");
                    failures.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if results.is_empty() {
            let reason = format!("all {} ensemble providers failed", attempted);
            return Ok(StageAttempt::failed(
                reason,
                StageDetails::Ensemble {
                    attempted,
                    succeeded: 0,
                    failures,
                    votes: Default::default(),
                },
            ));
        }

        let vote = self.voter.vote(&results, attempted, context.category());
        debug!(
            attempted,
            succeeded = results.len(),
            colors = vote.votes.len(),
            "Ensemble vote counted"
        );

        let details = StageDetails::Ensemble {
            attempted,
            succeeded: results.len(),
            failures,
            votes: vote.votes.clone(),
        };

        if vote.used_default {
            return Ok(StageAttempt::no_answer(
                "no provider named a color",
                vote.candidates,
                details,
            ));
        }

        match vote.top() {
            Some(top) if top.confidence >= self.min_confidence => {
                Ok(StageAttempt::succeeded(vote.candidates, details))
            }
            Some(top) => {
                let reason = format!(
                    "top vote {} at {:.2} is below {:.2}",
                    top.name, top.confidence, self.min_confidence
                );
                Ok(StageAttempt::no_answer(reason, vote.candidates, details))
            }
            None => Ok(StageAttempt::no_answer("no votes", Vec::new(), details)),
        }
    }
}
