//! Edge filtering for template search.
//!
//! The detector matches edge maps, not raw intensities: the card template and
//! every candidate photo region pass through the same gradient edge detector
//! so correlation scores are dominated by patch-grid structure rather than by
//! the very lighting differences the pipeline exists to remove.

use image::{GrayImage, RgbImage};

/// Edge detector thresholds.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Canny low hysteresis threshold.
    pub low_threshold: f32,
    /// Canny high hysteresis threshold.
    pub high_threshold: f32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            low_threshold: 40.0,
            high_threshold: 50.0,
        }
    }
}

/// Collapse a color photo to single-channel intensity.
pub fn to_grayscale(photo: &RgbImage) -> GrayImage {
    image::imageops::grayscale(photo)
}

/// Binary edge map of a grayscale image.
pub fn edge_map(gray: &GrayImage, config: &EdgeConfig) -> GrayImage {
    imageproc::edges::canny(gray, config.low_threshold, config.high_threshold)
}
