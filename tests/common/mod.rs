#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use listing_classifier::common::{DetectedObject, ResolvedImage, ScoredLabel};
use listing_classifier::{ClassifierError, InferenceProvider};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Fake backend with canned answers that counts label requests.
pub struct ScriptedProvider {
    name: String,
    labels: Vec<ScoredLabel>,
    objects: Vec<DetectedObject>,
    failure: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn labels(name: &str, raw: &[(&str, f32)]) -> Self {
        Self {
            name: name.to_string(),
            labels: raw.iter().map(|(l, s)| ScoredLabel::new(*l, *s)).collect(),
            objects: Vec::new(),
            failure: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str, reason: &str) -> Self {
        let mut provider = Self::labels(name, &[]);
        provider.failure = Some(reason.to_string());
        provider
    }

    pub fn with_objects(mut self, objects: Vec<DetectedObject>) -> Self {
        self.objects = objects;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify_labels(
        &self,
        _image: &ResolvedImage,
    ) -> Result<Vec<ScoredLabel>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.failure {
            Some(reason) => Err(ClassifierError::unavailable(&self.name, reason.clone())),
            None => Ok(self.labels.clone()),
        }
    }

    async fn detect_objects(
        &self,
        _image: &ResolvedImage,
    ) -> Result<Vec<DetectedObject>, ClassifierError> {
        Ok(self.objects.clone())
    }
}

/// PNG of a centered rectangle covering `fraction` of each side on a flat background.
pub fn product_photo(size: u32, background: [u8; 3], object: [u8; 3], fraction: f32) -> Vec<u8> {
    let margin = ((size as f32) * (1.0 - fraction) / 2.0).round() as u32;
    let mut img = RgbImage::from_pixel(size, size, Rgb(background));
    for y in margin..size - margin {
        for x in margin..size - margin {
            img.put_pixel(x, y, Rgb(object));
        }
    }
    encode_png(img)
}

pub fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode_png(RgbImage::from_pixel(width, height, Rgb(color)))
}

fn encode_png(img: RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode png");
    buf
}
