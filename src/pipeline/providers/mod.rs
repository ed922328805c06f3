pub mod huggingface;
pub mod service;
pub mod vision_chat;

use crate::common::image_source::ResolvedImage;
use crate::common::labels::{DetectedObject, ScoredLabel};
use crate::error::ClassifierError;
use async_trait::async_trait;

pub use huggingface::HuggingFaceProvider;
pub use service::{ProviderHandle, ProviderHandleBuilder, ProviderRequest, ProviderResponse};
pub use vision_chat::VisionChatProvider;

/// An opaque external inference backend.
///
/// Implementations must return a distinguishable error
/// (`ProviderUnavailable` / `ProviderMalformedResponse`) rather than
/// silently returning partial data.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Ranked classification labels for the image.
    async fn classify_labels(
        &self,
        image: &ResolvedImage,
    ) -> Result<Vec<ScoredLabel>, ClassifierError>;

    /// Object detections with normalized boxes. Providers without a detector
    /// return nothing.
    async fn detect_objects(
        &self,
        _image: &ResolvedImage,
    ) -> Result<Vec<DetectedObject>, ClassifierError> {
        Ok(Vec::new())
    }
}
