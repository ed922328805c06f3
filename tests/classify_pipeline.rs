use listing_classifier::common::{BoundingBox, DetectedObject};
use listing_classifier::pipeline::domain::{StageDetails, StageOutcome};
use listing_classifier::pipeline::SourceMethod;
use listing_classifier::quota::{FixedPeriod, InMemoryQuotaStore};
use listing_classifier::taxonomy::OverrideRule;
use listing_classifier::{
    Category, ClassificationPipelineBuilder, ClassificationResult, ClassifierError, Color,
    Configuration, ImageSource, UsageTracker,
};
use std::sync::Arc;
use std::time::Duration;

mod common;

use common::{product_photo, solid_png, ScriptedProvider};

const PURPLE: [u8; 3] = [128, 0, 128];
const WHITE: [u8; 3] = [255, 255, 255];

fn loafer_labels() -> Arc<ScriptedProvider> {
    Arc::new(ScriptedProvider::labels(
        "labels",
        &[("Loafer", 0.78), ("sock", 0.05)],
    ))
}

fn assert_result_invariants(result: &ClassificationResult) {
    assert!(!result.candidates.is_empty());
    assert!(result
        .candidates
        .windows(2)
        .all(|w| w[0].confidence >= w[1].confidence));
    assert!(result
        .candidates
        .iter()
        .all(|c| (0.0..=1.0).contains(&c.confidence)));
    assert_eq!(result.color, result.candidates[0].name);
    assert_eq!(result.confidence, result.candidates[0].confidence);
}

#[tokio::test]
async fn purple_loafer_falls_back_to_pixels() {
    let pipeline = ClassificationPipelineBuilder::new(Configuration::default())
        .with_label_provider(loafer_labels())
        .with_ensemble_provider(Arc::new(ScriptedProvider::labels(
            "resnet",
            &[("Loafer", 0.6), ("sock", 0.1)],
        )))
        .build()
        .unwrap();

    let result = pipeline
        .classify(ImageSource::Bytes(product_photo(224, WHITE, PURPLE, 0.5)))
        .await
        .unwrap();

    assert_result_invariants(&result);
    assert_eq!(result.category, Category::Footwear);
    assert_eq!(result.color, Color::Purple);
    assert_eq!(result.candidates[0].source_method, SourceMethod::Pixel);
    assert_eq!(result.candidates[0].rgb_approx, PURPLE);
    assert_eq!(result.object_detected.as_deref(), Some("Loafer"));

    let trace = result.debug_trace.unwrap();
    assert_eq!(trace.winning_stage, SourceMethod::Pixel);
    assert_eq!(
        trace.stage(SourceMethod::Ensemble).unwrap().outcome,
        StageOutcome::NoAnswer
    );
    match &trace.stage(SourceMethod::Pixel).unwrap().details {
        StageDetails::Pixel(analysis) => {
            assert_eq!(analysis.mean_rgb, Some(PURPLE));
            assert!(analysis.excluded > 0);
        }
        other => panic!("unexpected details {:?}", other),
    }
}

#[tokio::test]
async fn direct_failure_is_traced_and_ensemble_wins() {
    let direct = Arc::new(ScriptedProvider::failing("vit-direct", "HTTP 503: loading"));
    let pipeline = ClassificationPipelineBuilder::new(Configuration::default())
        .with_label_provider(loafer_labels())
        .with_direct_provider(direct.clone())
        .with_ensemble_provider(Arc::new(ScriptedProvider::labels(
            "vit-large",
            &[("purple loafer", 0.7)],
        )))
        .with_ensemble_provider(Arc::new(ScriptedProvider::failing("dino", "timed out")))
        .with_ensemble_provider(Arc::new(ScriptedProvider::labels(
            "resnet",
            &[("violet", 0.4), ("black", 0.2)],
        )))
        .build()
        .unwrap();

    let result = pipeline
        .classify(ImageSource::Bytes(solid_png(32, 32, [10, 160, 20])))
        .await
        .unwrap();

    assert_result_invariants(&result);
    assert_eq!(result.color, Color::Purple);
    assert_eq!(result.candidates[0].source_method, SourceMethod::Ensemble);
    assert_eq!(direct.calls(), 1);

    let trace = result.debug_trace.unwrap();
    let direct_stage = trace.stage(SourceMethod::Direct).unwrap();
    assert_eq!(direct_stage.outcome, StageOutcome::Failed);
    assert!(direct_stage
        .reason
        .as_deref()
        .unwrap()
        .contains("vit-direct"));

    let ensemble_stage = trace.stage(SourceMethod::Ensemble).unwrap();
    assert_eq!(ensemble_stage.outcome, StageOutcome::Succeeded);
    match &ensemble_stage.details {
        StageDetails::Ensemble {
            attempted,
            succeeded,
            failures,
            ..
        } => {
            assert_eq!((*attempted, *succeeded), (3, 2));
            assert_eq!(failures[0].provider, "dino");
        }
        other => panic!("unexpected details {:?}", other),
    }
    assert!(trace.stage(SourceMethod::Pixel).is_none());
}

#[tokio::test(start_paused = true)]
async fn slow_direct_provider_times_out() {
    let mut configuration = Configuration::default();
    configuration.provider_timeout_ms = 50;
    let pipeline = ClassificationPipelineBuilder::new(configuration)
        .with_direct_provider(Arc::new(
            ScriptedProvider::labels("slow", &[("red", 0.9)]).with_delay(Duration::from_secs(5)),
        ))
        .build()
        .unwrap();

    let result = pipeline
        .classify(ImageSource::Bytes(solid_png(16, 16, [20, 40, 200])))
        .await
        .unwrap();

    assert_eq!(result.color, Color::Blue);
    let trace = result.debug_trace.unwrap();
    let direct_stage = trace.stage(SourceMethod::Direct).unwrap();
    assert_eq!(direct_stage.outcome, StageOutcome::Failed);
    assert!(direct_stage.reason.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn exhausted_quota_fails_before_any_provider_call() {
    let labels = loafer_labels();
    let tracker = Arc::new(UsageTracker::with_period_source(
        Arc::new(InMemoryQuotaStore::new()),
        Arc::new(FixedPeriod::new("2024-06")),
        1,
    ));
    let pipeline = ClassificationPipelineBuilder::new(Configuration::default())
        .with_label_provider(labels.clone())
        .with_usage_tracker(tracker.clone())
        .build()
        .unwrap();

    let first = pipeline
        .classify(ImageSource::Bytes(solid_png(8, 8, PURPLE)))
        .await
        .unwrap();
    let quota = first.debug_trace.unwrap().quota.unwrap();
    assert!(quota.allowed);
    assert_eq!(quota.remaining, 1);
    assert_eq!(labels.calls(), 1);

    let second = pipeline
        .classify(ImageSource::Bytes(solid_png(8, 8, PURPLE)))
        .await;
    match second {
        Err(ClassifierError::QuotaExceeded { period, limit }) => {
            assert_eq!(period, "2024-06");
            assert_eq!(limit, 1);
        }
        other => panic!("expected quota error, got {:?}", other),
    }
    assert_eq!(labels.calls(), 1);
    assert_eq!(tracker.snapshot().await.unwrap().count, 1);
}

#[tokio::test]
async fn unsupported_input_is_rejected_without_spending_quota() {
    let labels = loafer_labels();
    let tracker = Arc::new(UsageTracker::new(Arc::new(InMemoryQuotaStore::new()), 10));
    let pipeline = ClassificationPipelineBuilder::new(Configuration::default())
        .with_label_provider(labels.clone())
        .with_usage_tracker(tracker.clone())
        .build()
        .unwrap();

    for source in [
        ImageSource::Url("ftp://example.com/shoe.png".to_string()),
        ImageSource::Bytes(b"definitely not an image".to_vec()),
        ImageSource::Url("data:text/plain;base64,aGVsbG8=".to_string()),
    ] {
        assert!(matches!(
            pipeline.classify(source).await,
            Err(ClassifierError::UnsupportedInputFormat(_))
        ));
    }
    assert_eq!(labels.calls(), 0);
    assert_eq!(tracker.snapshot().await.unwrap().count, 0);
}

#[tokio::test]
async fn remote_images_end_at_the_category_default() {
    let pipeline = ClassificationPipelineBuilder::new(Configuration::default())
        .with_label_provider(Arc::new(ScriptedProvider::labels(
            "labels",
            &[("jean, blue jean, denim", 0.66), ("miniskirt", 0.1)],
        )))
        .build()
        .unwrap();

    let result = pipeline
        .classify(ImageSource::Url(
            "https://cdn.example.com/listings/42.jpg".to_string(),
        ))
        .await
        .unwrap();

    assert_result_invariants(&result);
    assert_eq!(result.category, Category::Jeans);
    assert_eq!(result.color, Color::Blue);
    assert_eq!(result.confidence, 0.2);
    assert_eq!(result.candidates[0].source_method, SourceMethod::CategoryDefault);

    let trace = result.debug_trace.unwrap();
    assert_eq!(trace.image_size, None);
    assert_eq!(trace.input, "url");
    assert_eq!(
        trace.stage(SourceMethod::Pixel).unwrap().outcome,
        StageOutcome::NoAnswer
    );
}

#[tokio::test]
async fn forced_color_rule_short_circuits_providers() {
    let direct = Arc::new(ScriptedProvider::labels("direct", &[("black", 0.9)]));
    let pipeline = ClassificationPipelineBuilder::new(Configuration::default())
        .with_label_provider(Arc::new(ScriptedProvider::labels(
            "labels",
            &[("velvet loafer", 0.7)],
        )))
        .with_direct_provider(direct.clone())
        .with_rule(
            OverrideRule::new("velvet-is-purple", &["velvet"])
                .forcing_color(Color::Purple)
                .with_confidence(0.9),
        )
        .build()
        .unwrap();

    let result = pipeline
        .classify(ImageSource::Bytes(solid_png(8, 8, WHITE)))
        .await
        .unwrap();

    assert_eq!(result.color, Color::Purple);
    assert_eq!(result.confidence, 0.9);
    assert_eq!(result.candidates[0].source_method, SourceMethod::Rule);
    assert_eq!(direct.calls(), 0);
}

#[tokio::test]
async fn clog_override_beats_higher_scoring_sandal() {
    let pipeline = ClassificationPipelineBuilder::new(Configuration::default())
        .with_label_provider(Arc::new(ScriptedProvider::labels(
            "labels",
            &[("sandal", 0.6), ("clog, geta, patten, sabot", 0.3)],
        )))
        .build()
        .unwrap();

    let result = pipeline
        .classify(ImageSource::Bytes(solid_png(8, 8, PURPLE)))
        .await
        .unwrap();

    assert_eq!(result.category, Category::Footwear);
    assert!((result.category_confidence - 0.3).abs() < 1e-6);
    let category = result.debug_trace.unwrap().category.matched;
    assert_eq!(category.override_rule.as_deref(), Some("clog-family"));
    assert_eq!(
        category.matched_label.as_deref(),
        Some("clog, geta, patten, sabot")
    );
}

#[tokio::test]
async fn label_provider_failure_leaves_category_other() {
    let pipeline = ClassificationPipelineBuilder::new(Configuration::default())
        .with_label_provider(Arc::new(ScriptedProvider::failing("labels", "HTTP 500")))
        .build()
        .unwrap();

    let result = pipeline
        .classify(ImageSource::Bytes(solid_png(8, 8, PURPLE)))
        .await
        .unwrap();

    assert_eq!(result.category, Category::Other);
    assert_eq!(result.category_confidence, 0.0);
    assert_eq!(result.color, Color::Purple);
    let category = result.debug_trace.unwrap().category;
    assert!(category.provider_error.unwrap().contains("HTTP 500"));
}

#[tokio::test]
async fn detection_box_focuses_the_pixel_stage() {
    let labels = ScriptedProvider::labels("labels", &[("handbag", 0.8)]).with_objects(vec![
        DetectedObject::new("handbag", 0.95, BoundingBox::new(0.25, 0.25, 0.75, 0.75)),
    ]);
    let pipeline = ClassificationPipelineBuilder::new(Configuration::default())
        .with_label_provider(Arc::new(labels))
        .build()
        .unwrap();

    // Green frame around a red object; the frame is not background-colored.
    let result = pipeline
        .classify(ImageSource::Bytes(product_photo(
            120,
            [0, 150, 0],
            [200, 20, 20],
            0.5,
        )))
        .await
        .unwrap();

    assert_eq!(result.category, Category::Bag);
    assert_eq!(result.color, Color::Red);
    assert_eq!(result.object_detected.as_deref(), Some("handbag"));
}

#[tokio::test]
async fn result_serializes_as_camel_case_json() {
    let pipeline = ClassificationPipelineBuilder::new(Configuration::default())
        .with_label_provider(loafer_labels())
        .build()
        .unwrap();
    let result = pipeline
        .classify(ImageSource::Bytes(product_photo(64, WHITE, PURPLE, 0.5)))
        .await
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&result.to_json(false).unwrap()).unwrap();
    assert_eq!(json["category"], "footwear");
    assert_eq!(json["color"], "purple");
    assert!(json["categoryConfidence"].is_number());
    assert_eq!(json["debugTrace"]["winningStage"], "pixel");
    assert_eq!(json["debugTrace"]["stages"][0]["stage"], "rule");
}

#[tokio::test]
async fn one_vision_answer_serves_category_and_direct_color() {
    // colorOptions plus objectType, as a vision chat model reports them
    let vision = Arc::new(ScriptedProvider::labels(
        "gpt-4o-mini",
        &[("red", 0.8), ("maroon", 0.15), ("running shoes", 0.95)],
    ));
    let pipeline = ClassificationPipelineBuilder::new(Configuration::default())
        .with_label_provider(vision.clone())
        .with_direct_provider(vision.clone())
        .build()
        .unwrap();

    let result = pipeline
        .classify(ImageSource::Bytes(solid_png(8, 8, WHITE)))
        .await
        .unwrap();

    assert_result_invariants(&result);
    assert_eq!(result.category, Category::Footwear);
    assert_eq!(result.object_detected.as_deref(), Some("running shoes"));
    assert_eq!(result.color, Color::Red);
    assert!((result.confidence - 0.8).abs() < 1e-6);
    assert_eq!(result.candidates[0].source_method, SourceMethod::Direct);
    assert_eq!(vision.calls(), 2);
}
