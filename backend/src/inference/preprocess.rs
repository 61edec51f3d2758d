use image::DynamicImage;
use image::imageops::{self, FilterType};
use ndarray::{Array3, Array4, Axis};

use crate::error::PredictionError;

pub const IMAGE_SIZE: u32 = 224;
pub const CHANNELS: usize = 3;

/// A 224x224 RGB image with channel intensities scaled to `[0, 1]`, laid out
/// as `(height, width, channel)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedImage {
    pixels: Array3<f64>,
}

impl PreprocessedImage {
    pub fn from_image(image: &DynamicImage) -> Result<Self, PredictionError> {
        let rgb = image.to_rgb8();
        let resized = imageops::resize(&rgb, IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom);

        let side = IMAGE_SIZE as usize;
        let raw = resized.into_raw();
        let actual = raw.len();
        let pixels = Array3::from_shape_vec((side, side, CHANNELS), raw)
            .map_err(|_| PredictionError::ShapeMismatch {
                expected: side * side * CHANNELS,
                actual,
            })?
            .mapv(|v| f64::from(v) / 255.0);

        Ok(Self { pixels })
    }

    #[cfg(test)]
    pub fn pixels(&self) -> &Array3<f64> {
        &self.pixels
    }

    /// Mean over every channel of every pixel.
    pub fn mean(&self) -> f64 {
        self.pixels.mean().unwrap_or(0.0)
    }

    pub fn channel_mean(&self, channel: usize) -> f64 {
        if channel >= CHANNELS {
            return 0.0;
        }
        self.pixels
            .index_axis(Axis(2), channel)
            .mean()
            .unwrap_or(0.0)
    }

    /// Single-image batch `(1, 224, 224, 3)` in f32, as trained models expect.
    pub fn to_batch(&self) -> Array4<f32> {
        self.pixels.mapv(|v| v as f32).insert_axis(Axis(0))
    }
}
