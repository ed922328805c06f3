use crate::common::image_source::ResolvedImage;
use crate::common::labels::{DetectedObject, ScoredLabel};
use crate::pipeline::context::metrics::RequestMetrics;
use crate::pipeline::context::state::{CategorizedState, ProcessingState, ResolvedState};
use crate::pipeline::domain::CategoryTrace;
use crate::quota::QuotaDecision;
use crate::taxonomy::{Category, CategoryMatch, RuleEvaluation};
use std::time::{Duration, Instant};

// RequestContext with compile-time state tracking: color strategies only
// ever see a categorized request.
pub struct RequestContext<S> {
    image: ResolvedImage,
    input: &'static str,
    quota: Option<QuotaDecision>,
    metrics: RequestMetrics,
    processing_start: Instant,
    state: S,
}

impl<S: ProcessingState> RequestContext<S> {
    pub fn image(&self) -> &ResolvedImage {
        &self.image
    }

    pub fn input(&self) -> &'static str {
        self.input
    }

    pub fn quota(&self) -> Option<&QuotaDecision> {
        self.quota.as_ref()
    }

    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }

    pub fn elapsed(&self) -> Duration {
        self.processing_start.elapsed()
    }

    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }
}

impl RequestContext<ResolvedState> {
    pub fn new(image: ResolvedImage, input: &'static str) -> Self {
        Self {
            image,
            input,
            quota: None,
            metrics: RequestMetrics::new(),
            processing_start: Instant::now(),
            state: ResolvedState,
        }
    }

    pub fn record_quota(&mut self, decision: QuotaDecision) {
        self.quota = Some(decision);
    }

    pub fn into_categorized(mut self, category: CategoryTrace) -> RequestContext<CategorizedState> {
        self.metrics.record_categorization_duration(self.elapsed());
        RequestContext::<CategorizedState> {
            image: self.image,
            input: self.input,
            quota: self.quota,
            metrics: self.metrics,
            processing_start: self.processing_start,
            state: CategorizedState { category },
        }
    }
}

impl RequestContext<CategorizedState> {
    pub fn category(&self) -> Category {
        self.state.category.matched.category
    }

    pub fn category_match(&self) -> &CategoryMatch {
        &self.state.category.matched
    }

    pub fn labels(&self) -> &[ScoredLabel] {
        &self.state.category.labels
    }

    pub fn objects(&self) -> &[DetectedObject] {
        &self.state.category.objects
    }

    pub fn rules(&self) -> &RuleEvaluation {
        &self.state.category.rules
    }

    pub fn category_trace(&self) -> &CategoryTrace {
        &self.state.category
    }

    pub fn into_category_trace(self) -> CategoryTrace {
        self.state.category
    }
}
