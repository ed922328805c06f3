use crate::common::image_source::{DecodingMaterializer, ImageMaterializer, ImageSource};
use crate::common::labels::ScoredLabel;
use crate::config::Configuration;
use crate::error::ClassifierError;
use crate::pipeline::analysis::PixelColorExtractor;
use crate::pipeline::context::metrics::as_micros;
use crate::pipeline::context::{CategorizedState, RequestContext, ResolvedState};
use crate::pipeline::domain::{
    CategoryTrace, ClassificationResult, ColorCandidate, DebugTrace, SourceMethod, StageDetails,
    StageRecord,
};
use crate::pipeline::providers::{InferenceProvider, ProviderHandle};
use crate::pipeline::strategies::{
    CategoryDefaultStrategy, ColorStrategy, DirectStrategy, EnsembleStrategy, PixelStrategy,
    RuleStrategy, StageAttempt,
};
use crate::pipeline::voting::EnsembleVoter;
use crate::quota::UsageTracker;
use crate::taxonomy::{CategoryMatch, CategoryMatcher, Color, OverrideRule, RuleTable};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn, Span};

/// Category matching followed by the color fallback cascade.
///
/// Stages run in order and the first one that answers wins; answers from
/// different stages are never blended. Every attempted stage is traced.
pub struct ClassificationPipeline {
    materializer: Arc<dyn ImageMaterializer>,
    label_provider: Option<ProviderHandle>,
    usage_tracker: Option<Arc<UsageTracker>>,
    rules: RuleTable,
    matcher: CategoryMatcher,
    strategies: Vec<Box<dyn ColorStrategy>>,
    uses_providers: bool,
    collect_trace: bool,
}

impl ClassificationPipeline {
    pub fn builder() -> ClassificationPipelineBuilder {
        ClassificationPipelineBuilder::new(Configuration::default())
    }

    pub fn stages(&self) -> Vec<SourceMethod> {
        self.strategies.iter().map(|s| s.stage()).collect()
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    #[instrument(skip(self, source), fields(input = source.kind(), request_id = tracing::field::Empty))]
    pub async fn classify(
        &self,
        source: ImageSource,
    ) -> Result<ClassificationResult, ClassifierError> {
        let input = source.kind();
        let image = self.materializer.resolve(source)?;
        Span::current().record("request_id", tracing::field::display(image.request_id()));

        let mut context = RequestContext::new(image, input);
        self.reserve_quota(&mut context).await?;

        let category = self.categorize(&context).await;
        debug!(
            category = %category.matched.category,
            confidence = category.matched.confidence,
            override_rule = ?category.matched.override_rule,
            "Category decided"
        );
        let context = context.into_categorized(category);

        let mut stages = Vec::with_capacity(self.strategies.len());
        let mut winner: Option<(SourceMethod, Vec<ColorCandidate>)> = None;

        for strategy in &self.strategies {
            let stage = strategy.stage();
            let started = Instant::now();
            let attempt = match strategy.attempt(&context).await {
                Ok(attempt) => attempt,
                Err(e) if e.is_terminal() => return Err(e),
                Err(e) => {
                    warn!(stage = %stage, strategy = strategy.name(), error = %e, "Stage failed");
                    StageAttempt::failed(e.to_string(), StageDetails::None)
                }
            };
            let duration = started.elapsed();
            debug!(
                stage = %stage,
                outcome = ?attempt.outcome,
                candidates = attempt.candidates.len(),
                duration_us = as_micros(duration),
                "Stage finished"
            );

            let answered = attempt.is_answer();
            let candidates = attempt.candidates.clone();
            stages.push(StageRecord {
                stage,
                strategy: strategy.name().to_string(),
                outcome: attempt.outcome,
                reason: attempt.reason,
                duration_us: as_micros(duration),
                candidates: attempt.candidates,
                details: attempt.details,
            });

            if answered {
                winner = Some((stage, candidates));
                break;
            }
        }

        let (winning_stage, candidates) = winner.unwrap_or_else(|| {
            (
                SourceMethod::CategoryDefault,
                vec![ColorCandidate::unknown(SourceMethod::CategoryDefault)],
            )
        });

        Ok(self.assemble(context, stages, winning_stage, candidates))
    }

    async fn reserve_quota(
        &self,
        context: &mut RequestContext<ResolvedState>,
    ) -> Result<(), ClassifierError> {
        if !self.uses_providers {
            return Ok(());
        }
        let Some(tracker) = &self.usage_tracker else {
            return Ok(());
        };

        let decision = tracker.try_consume().await?;
        if !decision.allowed {
            warn!(period = %decision.period, limit = decision.limit, "Refusing classification");
            return Err(ClassifierError::QuotaExceeded {
                period: decision.period,
                limit: decision.limit,
            });
        }
        context.record_quota(decision);
        Ok(())
    }

    /// Never fails: a provider problem leaves the category at `other`.
    async fn categorize(&self, context: &RequestContext<ResolvedState>) -> CategoryTrace {
        let started = Instant::now();
        let Some(provider) = &self.label_provider else {
            return CategoryTrace {
                rules: self.rules.evaluate(&[]),
                ..CategoryTrace::without_provider(CategoryMatch::unmatched())
            };
        };

        let image = context.image();
        let (labels, objects) = tokio::join!(provider.labels(image), provider.objects(image));

        let mut provider_error = None;
        let labels = labels.unwrap_or_else(|e| {
            warn!(provider = %provider.name(), error = %e, "Label provider failed");
            provider_error = Some(e.to_string());
            Vec::new()
        });
        let objects = objects.unwrap_or_else(|e| {
            warn!(provider = %provider.name(), error = %e, "Object detection failed");
            provider_error.get_or_insert_with(|| e.to_string());
            Vec::new()
        });

        let evidence: Vec<ScoredLabel> = labels
            .iter()
            .cloned()
            .chain(objects.iter().map(|o| o.as_label()))
            .collect();
        let rules = self.rules.evaluate(&evidence);
        let matched = self.matcher.match_with(&evidence, &rules);

        CategoryTrace {
            labels,
            objects,
            provider_error,
            rules,
            matched,
            duration_us: as_micros(started.elapsed()),
        }
    }

    fn assemble(
        &self,
        context: RequestContext<CategorizedState>,
        stages: Vec<StageRecord>,
        winning_stage: SourceMethod,
        candidates: Vec<ColorCandidate>,
    ) -> ClassificationResult {
        let (color, confidence) = candidates
            .first()
            .map(|c| (c.name, c.confidence))
            .unwrap_or((Color::Unknown, 0.0));
        let category_match = context.category_match().clone();
        let object_detected = context
            .objects()
            .first()
            .map(|o| o.label.clone())
            .or_else(|| category_match.matched_label.clone());

        info!(
            category = %category_match.category,
            color = %color,
            confidence,
            stage = %winning_stage,
            elapsed_ms = context.elapsed().as_millis() as u64,
            "Classification complete"
        );

        let debug_trace = if self.collect_trace {
            let image = context.image();
            let (request_id, received_at, image_size) =
                (image.request_id(), image.received_at(), image.dimensions());
            let input = context.input();
            let quota = context.quota().cloned();
            let categorization_duration_us =
                context.metrics().categorization_duration().map(as_micros);
            let total_duration_us = as_micros(context.elapsed());
            Some(DebugTrace {
                request_id,
                received_at,
                input,
                image_size,
                quota,
                category: context.into_category_trace(),
                stages,
                winning_stage,
                categorization_duration_us,
                total_duration_us,
            })
        } else {
            None
        };

        ClassificationResult {
            category: category_match.category,
            color,
            confidence,
            category_confidence: category_match.confidence,
            candidates,
            object_detected,
            debug_trace,
        }
    }
}

impl std::fmt::Debug for ClassificationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationPipeline")
            .field("label_provider", &self.label_provider)
            .field("stages", &self.stages())
            .field("rules", &self.rules.len())
            .field("collect_trace", &self.collect_trace)
            .finish_non_exhaustive()
    }
}

pub struct ClassificationPipelineBuilder {
    configuration: Configuration,
    materializer: Option<Arc<dyn ImageMaterializer>>,
    label_provider: Option<Arc<dyn InferenceProvider>>,
    direct_provider: Option<Arc<dyn InferenceProvider>>,
    ensemble_providers: Vec<Arc<dyn InferenceProvider>>,
    usage_tracker: Option<Arc<UsageTracker>>,
    extra_rules: Vec<OverrideRule>,
}

impl ClassificationPipelineBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            materializer: None,
            label_provider: None,
            direct_provider: None,
            ensemble_providers: Vec::new(),
            usage_tracker: None,
            extra_rules: Vec::new(),
        }
    }

    pub fn with_config(mut self, configuration: Configuration) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn with_materializer(mut self, materializer: Arc<dyn ImageMaterializer>) -> Self {
        self.materializer = Some(materializer);
        self
    }

    /// Source of category labels and object detections.
    pub fn with_label_provider(mut self, provider: Arc<dyn InferenceProvider>) -> Self {
        self.label_provider = Some(provider);
        self
    }

    pub fn with_direct_provider(mut self, provider: Arc<dyn InferenceProvider>) -> Self {
        self.direct_provider = Some(provider);
        self
    }

    pub fn with_ensemble_provider(mut self, provider: Arc<dyn InferenceProvider>) -> Self {
        self.ensemble_providers.push(provider);
        self
    }

    pub fn with_usage_tracker(mut self, tracker: Arc<UsageTracker>) -> Self {
        self.usage_tracker = Some(tracker);
        self
    }

    pub fn with_rule(mut self, rule: OverrideRule) -> Self {
        self.extra_rules.push(rule);
        self
    }

    pub fn build(self) -> Result<ClassificationPipeline, ClassifierError> {
        let configuration = self.configuration;
        configuration
            .validate()
            .map_err(ClassifierError::InvalidConfig)?;
        for rule in &self.extra_rules {
            rule.validate().map_err(ClassifierError::InvalidConfig)?;
        }

        let timeout = configuration.provider_timeout();
        let handle = |provider: Arc<dyn InferenceProvider>| {
            ProviderHandle::builder(provider).timeout(timeout).build()
        };

        let uses_providers = self.label_provider.is_some()
            || self.direct_provider.is_some()
            || !self.ensemble_providers.is_empty();

        let mut strategies: Vec<Box<dyn ColorStrategy>> = vec![Box::new(RuleStrategy::new())];
        if let Some(provider) = self.direct_provider {
            strategies.push(Box::new(DirectStrategy::new(
                handle(provider),
                configuration.direct_min_confidence,
            )));
        }
        if !self.ensemble_providers.is_empty() {
            strategies.push(Box::new(EnsembleStrategy::new(
                self.ensemble_providers.into_iter().map(handle).collect(),
                EnsembleVoter::new(configuration.category_default_confidence),
                configuration.ensemble_min_confidence,
            )));
        }
        strategies.push(Box::new(PixelStrategy::new(PixelColorExtractor::new(
            configuration.pixel_config(),
        ))));
        strategies.push(Box::new(CategoryDefaultStrategy::new(
            configuration.category_default_confidence,
        )));

        let rules = self
            .extra_rules
            .into_iter()
            .fold(configuration.rule_table(), RuleTable::with_rule);

        Ok(ClassificationPipeline {
            materializer: self
                .materializer
                .unwrap_or_else(|| Arc::new(DecodingMaterializer::new())),
            label_provider: self.label_provider.map(handle),
            usage_tracker: self.usage_tracker,
            rules,
            matcher: CategoryMatcher::default(),
            strategies,
            uses_providers,
            collect_trace: configuration.collect_trace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::image_source::tests::png_bytes;
    use crate::pipeline::domain::StageOutcome;
    use crate::taxonomy::Category;

    #[tokio::test]
    async fn without_providers_only_local_stages_run() {
        let pipeline = ClassificationPipeline::builder().build().unwrap();
        assert_eq!(
            pipeline.stages(),
            vec![
                SourceMethod::Rule,
                SourceMethod::Pixel,
                SourceMethod::CategoryDefault
            ]
        );

        let result = pipeline
            .classify(ImageSource::Bytes(png_bytes(64, 64, [20, 40, 200])))
            .await
            .unwrap();
        assert_eq!(result.category, Category::Other);
        assert_eq!(result.color, Color::Blue);

        let trace = result.debug_trace.unwrap();
        assert_eq!(trace.winning_stage, SourceMethod::Pixel);
        assert_eq!(trace.stages.len(), 2);
        assert_eq!(trace.stages[0].outcome, StageOutcome::NoAnswer);
        assert_eq!(trace.image_size, Some((64, 64)));
        assert!(trace.quota.is_none());
        let categorized_us = trace.categorization_duration_us.unwrap();
        assert!(categorized_us <= trace.total_duration_us);
    }

    #[tokio::test]
    async fn invalid_configuration_is_rejected_at_build_time() {
        let mut configuration = Configuration::default();
        configuration.ensemble_min_confidence = 2.0;
        assert!(matches!(
            ClassificationPipelineBuilder::new(configuration).build(),
            Err(ClassifierError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn trace_collection_can_be_disabled() {
        let mut configuration = Configuration::default();
        configuration.collect_trace = false;
        let pipeline = ClassificationPipelineBuilder::new(configuration)
            .build()
            .unwrap();
        let result = pipeline
            .classify(ImageSource::Bytes(png_bytes(16, 16, [255, 255, 255])))
            .await
            .unwrap();
        assert!(result.debug_trace.is_none());
        assert_eq!(result.color, Color::Unknown);
        assert_eq!(result.candidates.len(), 1);
    }
}
