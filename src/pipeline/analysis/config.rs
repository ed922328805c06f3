use serde::{Deserialize, Serialize};

/// Tunable parameters of the center-weighted pixel color estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelColorConfig {
    /// Side of the square grid the region of interest is resampled into
    pub grid_size: u32,
    /// Samples with every channel above this are background
    pub white_cutoff: u8,
    /// Samples with every channel below this are shadow
    pub black_cutoff: u8,
    /// Saturation (percent) under which hue is ignored
    pub achromatic_saturation: f32,
    pub black_lightness: f32,
    pub white_lightness: f32,
    pub achromatic_confidence: f32,
}

impl Default for PixelColorConfig {
    fn default() -> Self {
        Self {
            grid_size: 200,
            white_cutoff: 245,
            black_cutoff: 10,
            achromatic_saturation: 15.0,
            black_lightness: 20.0,
            white_lightness: 80.0,
            achromatic_confidence: 0.7,
        }
    }
}

impl PixelColorConfig {
    pub fn with_grid_size(mut self, grid_size: u32) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.grid_size < 8 {
            return Err(format!(
                "Analysis grid must be at least 8 pixels wide, got {}",
                self.grid_size
            ));
        }
        if self.black_cutoff >= self.white_cutoff {
            return Err("Black cutoff must be below the white cutoff".to_string());
        }
        if !(0.0..=100.0).contains(&self.achromatic_saturation) {
            return Err("Achromatic saturation must be between 0 and 100".to_string());
        }
        if self.black_lightness >= self.white_lightness {
            return Err("Black lightness must be below white lightness".to_string());
        }
        if !(0.0..=1.0).contains(&self.achromatic_confidence) {
            return Err("Achromatic confidence must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }
}
