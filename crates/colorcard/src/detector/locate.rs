//! Card region reconstruction from a detection.
//!
//! The search works on a rotated, resized edge map; the crop happens once on
//! the original color photo. The same rotation primitive is used in both
//! places so matched coordinates stay valid.

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

use crate::DetectionResult;

/// Crop the detected card from the photo the detection ran on.
///
/// Bounds are the matched position and template size scaled back through the
/// detection's resize ratio, clamped to the photo. Returns `None` for
/// zero-confidence detections or degenerate bounds.
pub(crate) fn crop_card(
    photo: &RgbImage,
    detection: &DetectionResult,
    template_width: u32,
    template_height: u32,
) -> Option<RgbImage> {
    if detection.confidence <= 0.0 || !detection.ratio.is_finite() || detection.ratio <= 0.0 {
        return None;
    }

    let start_x = (f64::from(detection.x) * detection.ratio).round() as u32;
    let start_y = (f64::from(detection.y) * detection.ratio).round() as u32;
    let end_x =
        ((f64::from(detection.x) + f64::from(template_width)) * detection.ratio).round() as u32;
    let end_y =
        ((f64::from(detection.y) + f64::from(template_height)) * detection.ratio).round() as u32;

    let rotated;
    let working = if detection.angle == 0.0 {
        photo
    } else {
        rotated = rotate_about_center(
            photo,
            detection.angle.to_radians() as f32,
            Interpolation::Bilinear,
            Rgb([0, 0, 0]),
        );
        &rotated
    };

    let (w, h) = working.dimensions();
    let end_x = end_x.min(w);
    let end_y = end_y.min(h);
    if start_x >= end_x || start_y >= end_y {
        return None;
    }

    Some(
        image::imageops::crop_imm(working, start_x, start_y, end_x - start_x, end_y - start_y)
            .to_image(),
    )
}
