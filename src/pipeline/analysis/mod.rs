pub mod color_space;
pub mod config;
pub mod pixel_color;

pub use color_space::Hsl;
pub use config::PixelColorConfig;
pub use pixel_color::{
    ColorWindow, HueRange, NamingRule, PixelAnalysis, PixelColor, PixelColorExtractor,
    COLOR_WINDOWS, HUE_RANGES,
};
