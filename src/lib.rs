pub mod common;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod quota;
pub mod taxonomy;

pub use common::{ImageSource, ScoredLabel};
pub use config::{Configuration, HuggingFaceConfig, VisionChatConfig};
pub use error::{ClassifierError, QuotaStoreError};
pub use pipeline::{
    ClassificationPipeline, ClassificationPipelineBuilder, ClassificationResult, InferenceProvider,
};
pub use quota::{UsageTracker, DEFAULT_MONTHLY_LIMIT};
pub use taxonomy::{Category, Color};
