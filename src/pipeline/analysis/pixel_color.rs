//! Gaussian center-weighted dominant color estimation.
use super::color_space::Hsl;
use super::config::PixelColorConfig;
use crate::common::labels::BoundingBox;
use crate::taxonomy::Color;
use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::Serialize;

/// A hue interval `[from, to)` and the color it names.
#[derive(Debug, Clone, Copy)]
pub struct HueRange {
    pub from: f32,
    pub to: f32,
    pub color: Color,
    pub confidence: f32,
}

impl HueRange {
    fn contains(&self, hue: f32) -> bool {
        hue >= self.from && (hue < self.to || (self.to >= 360.0 && hue <= self.to))
    }
}

/// Non-overlapping, covers 0..=360.
pub static HUE_RANGES: &[HueRange] = &[
    HueRange { from: 0.0, to: 15.0, color: Color::Red, confidence: 0.8 },
    HueRange { from: 15.0, to: 45.0, color: Color::Orange, confidence: 0.75 },
    HueRange { from: 45.0, to: 65.0, color: Color::Yellow, confidence: 0.75 },
    HueRange { from: 65.0, to: 170.0, color: Color::Green, confidence: 0.8 },
    HueRange { from: 170.0, to: 260.0, color: Color::Blue, confidence: 0.8 },
    HueRange { from: 260.0, to: 290.0, color: Color::Purple, confidence: 0.75 },
    HueRange { from: 290.0, to: 345.0, color: Color::Pink, confidence: 0.7 },
    HueRange { from: 345.0, to: 360.0, color: Color::Red, confidence: 0.8 },
];

#[derive(Debug, Clone, Copy)]
pub enum WindowBounds {
    /// Inclusive channel ranges on the mean RGB.
    Rgb {
        r: (u8, u8),
        g: (u8, u8),
        b: (u8, u8),
    },
    /// Hue interval `[from, to)` plus saturation/lightness bounds in percent.
    Hsl {
        hue: (f32, f32),
        min_saturation: f32,
        max_saturation: f32,
        lightness: (f32, f32),
    },
}

/// Narrow color region that plain hue bucketing gets wrong.
#[derive(Debug, Clone, Copy)]
pub struct ColorWindow {
    pub name: &'static str,
    pub bounds: WindowBounds,
    pub color: Color,
    pub confidence: f32,
}

impl ColorWindow {
    fn contains(&self, [r, g, b]: [u8; 3], hsl: Hsl) -> bool {
        let within = |v: u8, (lo, hi): (u8, u8)| v >= lo && v <= hi;
        match self.bounds {
            WindowBounds::Rgb { r: rr, g: gr, b: br } => {
                within(r, rr) && within(g, gr) && within(b, br)
            }
            WindowBounds::Hsl {
                hue,
                min_saturation,
                max_saturation,
                lightness,
            } => {
                hsl.h >= hue.0
                    && hsl.h < hue.1
                    && hsl.s > min_saturation
                    && hsl.s <= max_saturation
                    && hsl.l >= lightness.0
                    && hsl.l <= lightness.1
            }
        }
    }
}

/// Checked in order before the achromatic test and the hue table.
pub static COLOR_WINDOWS: &[ColorWindow] = &[
    // Hue lands around 335°, which the table calls pink.
    ColorWindow {
        name: "burgundy",
        bounds: WindowBounds::Rgb {
            r: (80, 190),
            g: (0, 60),
            b: (30, 100),
        },
        color: Color::Red,
        confidence: 0.75,
    },
    ColorWindow {
        name: "brown",
        bounds: WindowBounds::Hsl {
            hue: (10.0, 45.0),
            min_saturation: 20.0,
            max_saturation: 100.0,
            lightness: (8.0, 40.0),
        },
        color: Color::Brown,
        confidence: 0.7,
    },
    ColorWindow {
        name: "beige",
        bounds: WindowBounds::Hsl {
            hue: (20.0, 65.0),
            min_saturation: 15.0,
            max_saturation: 75.0,
            lightness: (70.0, 92.0),
        },
        color: Color::Beige,
        confidence: 0.65,
    },
    ColorWindow {
        name: "fuchsia",
        bounds: WindowBounds::Hsl {
            hue: (270.0, 330.0),
            min_saturation: 30.0,
            max_saturation: 100.0,
            lightness: (0.0, 100.0),
        },
        color: Color::Purple,
        confidence: 0.8,
    },
];

/// Which naming rule produced the color.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NamingRule {
    NoValidPixels,
    Window { name: &'static str },
    Achromatic { lightness: f32 },
    HueRange { from: f32, to: f32 },
}

/// Derivation trace of a pixel color estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelAnalysis {
    pub mean_rgb: Option<[u8; 3]>,
    pub hsl: Option<Hsl>,
    pub rule: NamingRule,
    pub grid: (u32, u32),
    pub sampled: u32,
    pub excluded: u32,
    pub total_weight: f64,
    pub region: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelColor {
    pub color: Color,
    pub confidence: f32,
    pub analysis: PixelAnalysis,
}

impl PixelColor {
    pub fn rgb_approx(&self) -> [u8; 3] {
        self.analysis
            .mean_rgb
            .unwrap_or_else(|| self.color.approximate_rgb())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PixelColorExtractor {
    config: PixelColorConfig,
}

impl PixelColorExtractor {
    pub fn new(config: PixelColorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PixelColorConfig {
        &self.config
    }

    pub fn extract_color(&self, pixels: &RgbImage, region: Option<BoundingBox>) -> PixelColor {
        let region = region.and_then(|r| r.clamped());
        let grid_size = self.config.grid_size.max(1);
        let grid = (grid_size, grid_size);

        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return self.no_valid_pixels(grid, 0, 0, 0.0, region);
        }

        let roi = match region {
            Some(bbox) => {
                let (x, y, w, h) = pixel_rect(bbox, width, height);
                imageops::crop_imm(pixels, x, y, w, h).to_image()
            }
            None => pixels.clone(),
        };
        let sampled = imageops::resize(&roi, grid.0, grid.1, FilterType::Nearest);

        let sigma = grid.0.min(grid.1) as f64 / 4.0;
        let two_sigma_sq = 2.0 * sigma * sigma;
        let cx = grid.0 as f64 / 2.0;
        let cy = grid.1 as f64 / 2.0;

        let mut sums = [0.0f64; 3];
        let mut total_weight = 0.0f64;
        let mut excluded = 0u32;
        for (x, y, pixel) in sampled.enumerate_pixels() {
            if self.is_excluded(pixel.0) {
                excluded += 1;
                continue;
            }
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            let weight = (-(dx * dx + dy * dy) / two_sigma_sq).exp();
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += weight * channel as f64;
            }
            total_weight += weight;
        }

        let sample_count = grid.0 * grid.1;
        if total_weight <= 0.0 {
            return self.no_valid_pixels(grid, sample_count, excluded, total_weight, region);
        }

        let mean = sums.map(|s| (s / total_weight).round().clamp(0.0, 255.0) as u8);
        let hsl = Hsl::from_rgb(mean);
        let (color, confidence, rule) = self.name_color(mean, hsl);

        PixelColor {
            color,
            confidence,
            analysis: PixelAnalysis {
                mean_rgb: Some(mean),
                hsl: Some(hsl),
                rule,
                grid,
                sampled: sample_count,
                excluded,
                total_weight,
                region,
            },
        }
    }

    fn is_excluded(&self, [r, g, b]: [u8; 3]) -> bool {
        let white = self.config.white_cutoff;
        let black = self.config.black_cutoff;
        (r > white && g > white && b > white) || (r < black && g < black && b < black)
    }

    fn name_color(&self, rgb: [u8; 3], hsl: Hsl) -> (Color, f32, NamingRule) {
        if let Some(window) = COLOR_WINDOWS.iter().find(|w| w.contains(rgb, hsl)) {
            return (
                window.color,
                window.confidence,
                NamingRule::Window { name: window.name },
            );
        }

        if hsl.s < self.config.achromatic_saturation {
            let color = if hsl.l < self.config.black_lightness {
                Color::Black
            } else if hsl.l > self.config.white_lightness {
                Color::White
            } else {
                Color::Gray
            };
            return (
                color,
                self.config.achromatic_confidence,
                NamingRule::Achromatic { lightness: hsl.l },
            );
        }

        match HUE_RANGES.iter().find(|r| r.contains(hsl.h)) {
            Some(range) => (
                range.color,
                range.confidence,
                NamingRule::HueRange {
                    from: range.from,
                    to: range.to,
                },
            ),
            None => (Color::Unknown, 0.0, NamingRule::NoValidPixels),
        }
    }

    fn no_valid_pixels(
        &self,
        grid: (u32, u32),
        sampled: u32,
        excluded: u32,
        total_weight: f64,
        region: Option<BoundingBox>,
    ) -> PixelColor {
        PixelColor {
            color: Color::Unknown,
            confidence: 0.0,
            analysis: PixelAnalysis {
                mean_rgb: None,
                hsl: None,
                rule: NamingRule::NoValidPixels,
                grid,
                sampled,
                excluded,
                total_weight,
                region,
            },
        }
    }
}

/// Pixel rectangle covered by a clamped normalized box; never empty.
fn pixel_rect(bbox: BoundingBox, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let x0 = ((bbox.xmin * width as f32).floor() as u32).min(width - 1);
    let y0 = ((bbox.ymin * height as f32).floor() as u32).min(height - 1);
    let x1 = ((bbox.xmax * width as f32).ceil() as u32).clamp(x0 + 1, width);
    let y1 = ((bbox.ymax * height as f32).ceil() as u32).clamp(y0 + 1, height);
    (x0, y0, x1 - x0, y1 - y0)
}
