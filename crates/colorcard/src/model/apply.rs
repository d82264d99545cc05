//! Whole-image application of a fitted correction model.

use image::RgbImage;
use nalgebra::Vector3;

use super::CorrectionModel;

/// Correct every pixel of a photo with a fitted model.
///
/// Output channels are clipped to `[0, 255]` and rounded back to 8-bit.
/// Dimensions match the input exactly.
pub fn correct_image(photo: &RgbImage, model: &CorrectionModel) -> RgbImage {
    let mut corrected = RgbImage::new(photo.width(), photo.height());
    for (src, dst) in photo.pixels().zip(corrected.pixels_mut()) {
        let mapped = model.map(Vector3::new(
            f64::from(src[0]),
            f64::from(src[1]),
            f64::from(src[2]),
        ));
        for ch in 0..3 {
            dst[ch] = mapped[ch].clamp(0.0, 255.0).round() as u8;
        }
    }
    corrected
}
