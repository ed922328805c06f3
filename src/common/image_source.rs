use crate::error::ClassifierError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use image::RgbImage;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

/// Raw input as handed over by the calling application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Url(String),
}

impl ImageSource {
    pub fn kind(&self) -> &'static str {
        match self {
            ImageSource::Bytes(_) => "bytes",
            ImageSource::Url(_) => "url",
        }
    }
}

/// What providers receive: either the encoded image or a URL they fetch themselves.
#[derive(Debug, Clone)]
pub enum ImagePayload {
    Encoded(Arc<[u8]>),
    Remote(Url),
}

/// Canonical in-memory form of an `ImageSource`, produced once per request.
/// Cloning shares the payload and pixel buffers.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    request_id: Uuid,
    payload: ImagePayload,
    pixels: Option<Arc<RgbImage>>,
    received_at: DateTime<Utc>,
}

impl ResolvedImage {
    pub fn new(payload: ImagePayload, pixels: Option<RgbImage>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            payload,
            pixels: pixels.map(Arc::new),
            received_at: Utc::now(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn payload(&self) -> &ImagePayload {
        &self.payload
    }

    pub fn pixels(&self) -> Option<&RgbImage> {
        self.pixels.as_deref()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.pixels.as_ref().map(|p| p.dimensions())
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

/// Turns an `ImageSource` into pixel-addressable data. Hosts that can fetch
/// remote images plug in their own implementation.
pub trait ImageMaterializer: Send + Sync {
    fn resolve(&self, source: ImageSource) -> Result<ResolvedImage, ClassifierError>;
}

/// Decodes byte buffers and `data:` URLs with the `image` crate; http(s) URLs
/// are passed through to providers without pixels.
#[derive(Debug, Clone, Default)]
pub struct DecodingMaterializer;

impl DecodingMaterializer {
    pub fn new() -> Self {
        Self
    }

    fn decode(bytes: Vec<u8>) -> Result<ResolvedImage, ClassifierError> {
        if bytes.is_empty() {
            return Err(ClassifierError::UnsupportedInputFormat(
                "empty image buffer".to_string(),
            ));
        }
        let format = image::guess_format(&bytes).map_err(|e| {
            ClassifierError::UnsupportedInputFormat(format!("unrecognized image bytes: {}", e))
        })?;
        let decoded = image::load_from_memory_with_format(&bytes, format).map_err(|e| {
            ClassifierError::UnsupportedInputFormat(format!("undecodable {:?} image: {}", format, e))
        })?;
        Ok(ResolvedImage::new(
            ImagePayload::Encoded(Arc::from(bytes)),
            Some(decoded.to_rgb8()),
        ))
    }

    fn decode_data_url(raw: &str) -> Result<ResolvedImage, ClassifierError> {
        let rest = raw.get("data:".len()..).unwrap_or_default();
        let (meta, data) = rest.split_once(',').ok_or_else(|| {
            ClassifierError::UnsupportedInputFormat("data URL without payload".to_string())
        })?;
        if !meta.starts_with("image/") || !meta.ends_with(";base64") {
            return Err(ClassifierError::UnsupportedInputFormat(format!(
                "data URL must be a base64 image, got '{}'",
                meta
            )));
        }
        let bytes = STANDARD.decode(data.trim()).map_err(|e| {
            ClassifierError::UnsupportedInputFormat(format!("invalid base64 payload: {}", e))
        })?;
        Self::decode(bytes)
    }
}

impl ImageMaterializer for DecodingMaterializer {
    fn resolve(&self, source: ImageSource) -> Result<ResolvedImage, ClassifierError> {
        match source {
            ImageSource::Bytes(bytes) => Self::decode(bytes),
            ImageSource::Url(raw) => {
                let trimmed = raw.trim();
                let url = Url::parse(trimmed).map_err(|e| {
                    ClassifierError::UnsupportedInputFormat(format!("malformed URL: {}", e))
                })?;
                match url.scheme() {
                    "data" => Self::decode_data_url(trimmed),
                    "http" | "https" if url.host().is_some() => {
                        Ok(ResolvedImage::new(ImagePayload::Remote(url), None))
                    }
                    other => Err(ClassifierError::UnsupportedInputFormat(format!(
                        "unsupported URL scheme '{}'",
                        other
                    ))),
                }
            }
        }
    }
}
