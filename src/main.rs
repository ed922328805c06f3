use clap::Parser;
use listing_classifier::pipeline::providers::{HuggingFaceProvider, VisionChatProvider};
use listing_classifier::quota::{InMemoryQuotaStore, JsonFileQuotaStore, QuotaStore};
use listing_classifier::{
    ClassificationPipelineBuilder, ClassifierError, Configuration, ImageSource, UsageTracker,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

/// Classify a product photo into a listing category and dominant color.
#[derive(Parser, Debug)]
#[command(name = "listing-classifier", version)]
struct Args {
    /// Image file, http(s) URL or data:image URL
    input: String,

    /// TOML configuration file
    #[arg(short, long, env = "LISTING_CLASSIFIER_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file holding the monthly usage counter
    #[arg(long)]
    usage_file: Option<PathBuf>,

    /// Print single-line JSON
    #[arg(long)]
    compact: bool,
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_input(input: &str) -> Result<ImageSource, ClassifierError> {
    let lowered = input.trim_start().to_ascii_lowercase();
    if ["http://", "https://", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return Ok(ImageSource::Url(input.trim().to_string()));
    }
    Ok(ImageSource::Bytes(tokio::fs::read(input).await?))
}

fn build_pipeline(
    configuration: Configuration,
    usage_file: Option<PathBuf>,
) -> Result<ClassificationPipelineBuilder, ClassifierError> {
    let store: Arc<dyn QuotaStore> = match usage_file.or_else(|| configuration.usage_file.clone()) {
        Some(path) => Arc::new(JsonFileQuotaStore::new(path)),
        None => Arc::new(InMemoryQuotaStore::new()),
    };
    let tracker = Arc::new(UsageTracker::new(store, configuration.monthly_limit));

    let hf = configuration.huggingface.clone();
    let vision = configuration.vision.clone();
    let mut builder = ClassificationPipelineBuilder::new(configuration).with_usage_tracker(tracker);

    if hf.api_token.is_none() && vision.api_key.is_none() {
        info!("No provider credentials configured; running local analysis only");
        return Ok(builder);
    }

    let client = reqwest::Client::new();
    let vision_provider = if vision.api_key.is_some() {
        Some(Arc::new(VisionChatProvider::new(client.clone(), &vision)?))
    } else {
        None
    };

    if hf.api_token.is_some() {
        let mut label_provider = HuggingFaceProvider::new(client.clone(), &hf, &hf.label_model)?;
        if let Some(model) = &hf.detection_model {
            label_provider = label_provider.with_detection_model(model);
        }
        builder = builder.with_label_provider(Arc::new(label_provider));

        if let (None, Some(model)) = (&vision_provider, &hf.direct_model) {
            builder = builder.with_direct_provider(Arc::new(HuggingFaceProvider::new(
                client.clone(),
                &hf,
                model,
            )?));
        }
        for model in &hf.ensemble_models {
            builder = builder.with_ensemble_provider(Arc::new(HuggingFaceProvider::new(
                client.clone(),
                &hf,
                model,
            )?));
        }
    }

    if let Some(provider) = vision_provider {
        info!(model = %vision.model, "Vision model answers the direct stage");
        if hf.api_token.is_none() {
            builder = builder.with_label_provider(provider.clone());
        }
        builder = builder.with_direct_provider(provider);
    }

    Ok(builder)
}

#[tokio::main]
async fn main() -> Result<(), ClassifierError> {
    let args = Args::parse();
    let configuration = Configuration::load(args.config.as_deref())?;
    let level = configuration
        .tracing_level()
        .map_err(ClassifierError::InvalidConfig)?;
    init_logging(level);

    let pipeline = build_pipeline(configuration, args.usage_file)?.build()?;
    let source = read_input(&args.input).await?;
    let result = pipeline.classify(source).await?;

    println!("{}", result.to_json(!args.compact)?);
    Ok(())
}
