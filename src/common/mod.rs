pub mod image_source;
pub mod labels;

pub use image_source::{DecodingMaterializer, ImageMaterializer, ImagePayload, ImageSource, ResolvedImage};
pub use labels::{BoundingBox, DetectedObject, ScoredLabel};
