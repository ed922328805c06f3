//! Hugging Face hosted inference API adapter.
use super::InferenceProvider;
use crate::common::image_source::{ImagePayload, ResolvedImage};
use crate::common::labels::{BoundingBox, DetectedObject, ScoredLabel};
use crate::config::HuggingFaceConfig;
use crate::error::ClassifierError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Deserialize)]
struct PixelBox {
    xmin: f32,
    ymin: f32,
    xmax: f32,
    ymax: f32,
}

#[derive(Debug, Deserialize)]
struct RawDetection {
    label: String,
    score: f32,
    #[serde(rename = "box")]
    bounding_box: PixelBox,
}

#[derive(Debug, Clone)]
pub struct HuggingFaceProvider {
    client: Client,
    api_token: String,
    base_url: Url,
    model: String,
    detection_model: Option<String>,
}

impl HuggingFaceProvider {
    pub fn new(
        client: Client,
        config: &HuggingFaceConfig,
        model: impl Into<String>,
    ) -> Result<Self, ClassifierError> {
        let api_token = config.api_token.clone().ok_or_else(|| {
            ClassifierError::InvalidConfig("huggingface.api_token is not set".to_string())
        })?;
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ClassifierError::InvalidConfig(format!(
                "huggingface.base_url '{}' is invalid: {}",
                config.base_url, e
            ))
        })?;
        Ok(Self {
            client,
            api_token,
            base_url,
            model: model.into(),
            detection_model: None,
        })
    }

    pub fn with_detection_model(mut self, model: impl Into<String>) -> Self {
        self.detection_model = Some(model.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}", self.base_url.as_str().trim_end_matches('/'), model)
    }

    #[instrument(skip(self, image))]
    async fn post<T: DeserializeOwned>(
        &self,
        model: &str,
        image: &ResolvedImage,
    ) -> Result<T, ClassifierError> {
        let url = self.endpoint(model);
        debug!(url = %url, request_id = %image.request_id(), "Sending inference request");

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token));
        let request = match image.payload() {
            ImagePayload::Encoded(bytes) => request
                .header("Content-Type", "application/octet-stream")
                .body(bytes.to_vec()),
            ImagePayload::Remote(remote) => {
                request.json(&serde_json::json!({ "inputs": remote.as_str() }))
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| ClassifierError::unavailable(model, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::unavailable(
                model,
                format!("HTTP {}: {}", status.as_u16(), truncate(&body, 200)),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClassifierError::unavailable(model, format!("reading body: {}", e)))?;
        parse_body(model, &body)
    }
}

pub(super) fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

fn parse_body<T: DeserializeOwned>(model: &str, body: &str) -> Result<T, ClassifierError> {
    serde_json::from_str(body).map_err(|e| {
        ClassifierError::malformed(model, format!("{} in body '{}'", e, truncate(body, 120)))
    })
}

/// Detection boxes arrive in pixels; they are normalized by the image size.
/// Without known dimensions, boxes that are already in [0, 1] are kept and
/// anything else covers the whole image.
fn normalize_detections(
    raw: Vec<RawDetection>,
    dimensions: Option<(u32, u32)>,
) -> Vec<DetectedObject> {
    raw.into_iter()
        .map(|d| {
            let b = d.bounding_box;
            let bbox = match dimensions {
                Some((w, h)) if w > 0 && h > 0 => BoundingBox::new(
                    b.xmin / w as f32,
                    b.ymin / h as f32,
                    b.xmax / w as f32,
                    b.ymax / h as f32,
                ),
                _ if b.xmax <= 1.0 && b.ymax <= 1.0 => {
                    BoundingBox::new(b.xmin, b.ymin, b.xmax, b.ymax)
                }
                _ => BoundingBox::full(),
            };
            let bbox = bbox.clamped().unwrap_or_else(BoundingBox::full);
            DetectedObject::new(d.label, d.score, bbox)
        })
        .collect()
}

#[async_trait]
impl InferenceProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn classify_labels(
        &self,
        image: &ResolvedImage,
    ) -> Result<Vec<ScoredLabel>, ClassifierError> {
        self.post(&self.model, image).await
    }

    async fn detect_objects(
        &self,
        image: &ResolvedImage,
    ) -> Result<Vec<DetectedObject>, ClassifierError> {
        let Some(model) = self.detection_model.as_deref() else {
            return Ok(Vec::new());
        };
        let raw: Vec<RawDetection> = self.post(model, image).await?;
        Ok(normalize_detections(raw, image.dimensions()))
    }
}
