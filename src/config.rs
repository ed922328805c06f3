use crate::error::ClassifierError;
use crate::pipeline::analysis::PixelColorConfig;
use crate::quota::DEFAULT_MONTHLY_LIMIT;
use crate::taxonomy::{OverrideRule, RuleTable};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Hosted inference API settings. Providers are only wired when a token is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuggingFaceConfig {
    pub api_token: Option<String>,
    pub base_url: String,
    /// Classifier whose labels drive the category decision.
    pub label_model: String,
    pub detection_model: Option<String>,
    /// Fast-path color model; `None` skips the direct stage.
    pub direct_model: Option<String>,
    pub ensemble_models: Vec<String>,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: "https://api-inference.huggingface.co".to_string(),
            label_model: "google/vit-base-patch16-224".to_string(),
            detection_model: None,
            direct_model: Some("google/vit-base-patch16-224".to_string()),
            ensemble_models: vec![
                "google/vit-large-patch16-224".to_string(),
                "microsoft/resnet-50".to_string(),
                "facebook/dinov2-base".to_string(),
            ],
        }
    }
}

/// Vision chat-completions settings. When an API key is present the model
/// answers the direct stage, and also supplies category labels if no Hugging
/// Face token is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionChatConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    /// Image detail hint: "low", "high" or "auto".
    pub detail: String,
}

impl Default for VisionChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 500,
            detail: "high".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub monthly_limit: u32,
    pub provider_timeout_ms: u64,
    pub direct_min_confidence: f32,
    pub ensemble_min_confidence: f32,
    pub category_default_confidence: f32,
    pub analysis_grid_size: u32,
    pub collect_trace: bool,
    /// JSON file backing the usage counter; in-memory when unset.
    pub usage_file: Option<PathBuf>,
    pub log_level: String,
    /// Appended to the built-in override rules.
    pub rules: Vec<OverrideRule>,
    pub huggingface: HuggingFaceConfig,
    pub vision: VisionChatConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            monthly_limit: DEFAULT_MONTHLY_LIMIT,
            provider_timeout_ms: 10_000,
            direct_min_confidence: 0.5,
            ensemble_min_confidence: 0.3,
            category_default_confidence: 0.2,
            analysis_grid_size: 200,
            collect_trace: true,
            usage_file: None,
            log_level: "info".to_string(),
            rules: Vec::new(),
            huggingface: HuggingFaceConfig::default(),
            vision: VisionChatConfig::default(),
        }
    }
}

impl Configuration {
    /// Layered load: defaults, then `path` (if given), then
    /// `./listing-classifier.toml`, then `LISTING_CLASSIFIER__*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ClassifierError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder
            .add_source(File::with_name("listing-classifier").required(false))
            .add_source(
                Environment::with_prefix("LISTING_CLASSIFIER")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("huggingface.ensemble_models"),
            );

        let configuration: Configuration = builder.build()?.try_deserialize()?;
        configuration
            .validate()
            .map_err(ClassifierError::InvalidConfig)?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.monthly_limit == 0 {
            return Err("Monthly limit must be greater than 0".to_string());
        }

        if self.provider_timeout_ms == 0 {
            return Err("Provider timeout must be greater than 0".to_string());
        }

        for (name, value) in [
            ("direct_min_confidence", self.direct_min_confidence),
            ("ensemble_min_confidence", self.ensemble_min_confidence),
            ("category_default_confidence", self.category_default_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be between 0.0 and 1.0, got {}", name, value));
            }
        }

        self.pixel_config().validate()?;
        self.tracing_level()?;

        for rule in &self.rules {
            rule.validate()?;
        }

        if self.huggingface.label_model.trim().is_empty() {
            return Err("huggingface.label_model must not be empty".to_string());
        }

        if self.vision.model.trim().is_empty() {
            return Err("vision.model must not be empty".to_string());
        }
        if self.vision.max_tokens == 0 {
            return Err("vision.max_tokens must be greater than 0".to_string());
        }
        if !["low", "high", "auto"].contains(&self.vision.detail.as_str()) {
            return Err(format!(
                "vision.detail must be low, high or auto, got '{}'",
                self.vision.detail
            ));
        }

        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn pixel_config(&self) -> PixelColorConfig {
        PixelColorConfig::default().with_grid_size(self.analysis_grid_size)
    }

    /// Built-in rules plus the configured ones.
    pub fn rule_table(&self) -> RuleTable {
        self.rules
            .iter()
            .cloned()
            .fold(RuleTable::standard(), RuleTable::with_rule)
    }

    pub fn tracing_level(&self) -> Result<Level, String> {
        Level::from_str(self.log_level.trim())
            .map_err(|_| format!("Unknown log level '{}'", self.log_level))
    }
}
