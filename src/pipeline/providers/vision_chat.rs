//! Vision chat-completions adapter: one prompt, one JSON answer naming the
//! object and its ranked colors.
use super::huggingface::truncate;
use super::InferenceProvider;
use crate::common::image_source::{ImagePayload, ResolvedImage};
use crate::common::labels::ScoredLabel;
use crate::config::VisionChatConfig;
use crate::error::ClassifierError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

/// Score given to the object type and to a bare `color` answer.
const ANSWER_CONFIDENCE: f32 = 0.95;

const PROMPT: &str = "\
Look at the product in this photo and answer with a single JSON object:
{
  \"objectType\": \"short generic name of the main object, e.g. running shoes\",
  \"category\": \"one of clothes, shoes, accessories, electronics, kitchen, tickets, other\",
  \"color\": \"basic color name of the main object\",
  \"colorOptions\": [
    {\"color\": \"most likely color\", \"confidence\": 0.8},
    {\"color\": \"second color\", \"confidence\": 0.15},
    {\"color\": \"third color\", \"confidence\": 0.05}
  ]
}
Use basic color names such as red or navy, not brand shade names. Reply with JSON only.";

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ColorOption {
    color: String,
    confidence: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisionAnswer {
    #[serde(default)]
    object_type: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    color_options: Vec<ColorOption>,
}

impl VisionAnswer {
    /// Ranked color options become labels; the object type rides along so the
    /// category matcher can use it.
    fn into_labels(self) -> Vec<ScoredLabel> {
        let mut labels: Vec<ScoredLabel> = self
            .color_options
            .into_iter()
            .filter(|o| is_answer(&o.color))
            .map(|o| ScoredLabel::new(o.color.trim(), as_fraction(o.confidence)))
            .collect();

        if labels.is_empty() {
            if let Some(color) = self.color.filter(|c| is_answer(c)) {
                labels.push(ScoredLabel::new(color.trim(), ANSWER_CONFIDENCE));
            }
        }
        if let Some(object) = self.object_type.filter(|o| is_answer(o)) {
            labels.push(ScoredLabel::new(object.trim(), ANSWER_CONFIDENCE));
        }
        labels
    }
}

fn is_answer(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty()
        && !text.eq_ignore_ascii_case("unknown")
        && !text.eq_ignore_ascii_case("error")
}

/// Models sometimes answer in percent.
fn as_fraction(confidence: f32) -> f32 {
    let value = if confidence > 1.0 {
        confidence / 100.0
    } else {
        confidence
    };
    value.clamp(0.0, 1.0)
}

/// The outermost `{...}` of a reply that may carry prose or code fences.
fn json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

fn parse_answer(model: &str, body: &str) -> Result<VisionAnswer, ClassifierError> {
    let completion: ChatCompletion = serde_json::from_str(body).map_err(|e| {
        ClassifierError::malformed(model, format!("{} in body '{}'", e, truncate(body, 120)))
    })?;
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ClassifierError::malformed(model, "completion has no message content"))?;
    let object = json_object(&content).ok_or_else(|| {
        ClassifierError::malformed(
            model,
            format!("no JSON object in reply '{}'", truncate(&content, 120)),
        )
    })?;
    serde_json::from_str(object).map_err(|e| {
        ClassifierError::malformed(model, format!("{} in reply '{}'", e, truncate(object, 120)))
    })
}

/// Remote images are passed by URL; local bytes travel as a data URL.
fn image_url(image: &ResolvedImage) -> String {
    match image.payload() {
        ImagePayload::Remote(url) => url.to_string(),
        ImagePayload::Encoded(bytes) => {
            let mime = image::guess_format(bytes)
                .map(|format| format.to_mime_type())
                .unwrap_or("image/jpeg");
            format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
        }
    }
}

#[derive(Debug, Clone)]
pub struct VisionChatProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
    detail: String,
}

impl VisionChatProvider {
    pub fn new(client: Client, config: &VisionChatConfig) -> Result<Self, ClassifierError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ClassifierError::InvalidConfig("vision.api_key is not set".to_string())
        })?;
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ClassifierError::InvalidConfig(format!(
                "vision.base_url '{}' is invalid: {}",
                config.base_url, e
            ))
        })?;
        Ok(Self {
            client,
            api_key,
            endpoint: format!(
                "{}/chat/completions",
                base_url.as_str().trim_end_matches('/')
            ),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            detail: config.detail.clone(),
        })
    }

    fn request_body(&self, image: &ResolvedImage) -> serde_json::Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": PROMPT },
                    {
                        "type": "image_url",
                        "image_url": { "url": image_url(image), "detail": self.detail }
                    }
                ]
            }]
        })
    }

    #[instrument(skip(self, image), fields(model = %self.model))]
    async fn ask(&self, image: &ResolvedImage) -> Result<VisionAnswer, ClassifierError> {
        debug!(url = %self.endpoint, request_id = %image.request_id(), "Sending vision request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(image))
            .send()
            .await
            .map_err(|e| {
                ClassifierError::unavailable(&self.model, format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::unavailable(
                &self.model,
                format!("HTTP {}: {}", status.as_u16(), truncate(&body, 200)),
            ));
        }

        let body = response.text().await.map_err(|e| {
            ClassifierError::unavailable(&self.model, format!("reading body: {}", e))
        })?;
        parse_answer(&self.model, &body)
    }
}

#[async_trait]
impl InferenceProvider for VisionChatProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn classify_labels(
        &self,
        image: &ResolvedImage,
    ) -> Result<Vec<ScoredLabel>, ClassifierError> {
        let answer = self.ask(image).await?;
        Ok(answer.into_labels())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::image_source::tests::png_bytes;
    use crate::pipeline::strategies::direct::extract_direct_colors;
    use crate::taxonomy::{Category, CategoryMatcher, Color};
    use std::sync::Arc;

    fn completion(content: &str) -> String {
        json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
        .to_string()
    }

    #[test]
    fn color_options_and_object_type_become_labels() {
        let body = completion(
            "```json\n{\"objectType\": \"running shoes\", \"category\": \"shoes\", \"color\": \"red\", \
             \"colorOptions\": [{\"color\": \"red\", \"confidence\": 0.8}, \
             {\"color\": \"maroon\", \"confidence\": 0.15}]}\n```",
        );
        let labels = parse_answer("gpt-4o-mini", &body).unwrap().into_labels();
        assert_eq!(
            labels,
            vec![
                ScoredLabel::new("red", 0.8),
                ScoredLabel::new("maroon", 0.15),
                ScoredLabel::new("running shoes", ANSWER_CONFIDENCE),
            ]
        );

        let colors = extract_direct_colors(&labels);
        assert_eq!(colors[0].name, Color::Red);
        assert!((colors[0].confidence - 0.8).abs() < 1e-6);
        assert_eq!(
            CategoryMatcher::default().match_category(&labels).category,
            Category::Footwear
        );
    }

    #[test]
    fn percentages_and_bare_colors_are_accepted() {
        let body = completion(
            "{\"objectType\": \"backpack\", \"colorOptions\": [{\"color\": \"navy\", \"confidence\": 70}]}",
        );
        let labels = parse_answer("m", &body).unwrap().into_labels();
        assert_eq!(labels[0], ScoredLabel::new("navy", 0.7));

        let body = completion("{\"objectType\": \"unknown\", \"color\": \"green\", \"colorOptions\": []}");
        let labels = parse_answer("m", &body).unwrap().into_labels();
        assert_eq!(labels, vec![ScoredLabel::new("green", ANSWER_CONFIDENCE)]);
    }

    #[test]
    fn prose_replies_are_malformed() {
        let body = completion("Sorry, I can't tell what this is.");
        match parse_answer("gpt-4o-mini", &body).unwrap_err() {
            ClassifierError::ProviderMalformedResponse { provider, reason } => {
                assert_eq!(provider, "gpt-4o-mini");
                assert!(reason.contains("no JSON object"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = parse_answer("m", r#"{"error": {"message": "bad key"}}"#).unwrap_err();
        assert!(matches!(err, ClassifierError::ProviderMalformedResponse { .. }));
    }

    #[test]
    fn local_images_are_sent_as_data_urls() {
        let bytes = png_bytes(4, 4, [255, 0, 0]);
        let image = ResolvedImage::new(ImagePayload::Encoded(Arc::from(bytes)), None);
        assert!(image_url(&image).starts_with("data:image/png;base64,"));

        let remote = Url::parse("https://images.example.com/shoe.jpg").unwrap();
        let image = ResolvedImage::new(ImagePayload::Remote(remote), None);
        assert_eq!(image_url(&image), "https://images.example.com/shoe.jpg");
    }

    #[test]
    fn request_carries_model_and_detail() {
        let config = VisionChatConfig {
            api_key: Some("sk-test".to_string()),
            base_url: "https://llm.example.com/v1/".to_string(),
            ..VisionChatConfig::default()
        };
        let provider = VisionChatProvider::new(Client::new(), &config).unwrap();
        assert_eq!(provider.endpoint, "https://llm.example.com/v1/chat/completions");

        let remote = Url::parse("https://images.example.com/bag.jpg").unwrap();
        let body = provider.request_body(&ResolvedImage::new(ImagePayload::Remote(remote), None));
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 500);
        let image_part = &body["messages"][0]["content"][1]["image_url"];
        assert_eq!(image_part["url"], "https://images.example.com/bag.jpg");
        assert_eq!(image_part["detail"], "high");
    }

    #[test]
    fn requires_an_api_key() {
        assert!(matches!(
            VisionChatProvider::new(Client::new(), &VisionChatConfig::default()),
            Err(ClassifierError::InvalidConfig(_))
        ));
    }
}
