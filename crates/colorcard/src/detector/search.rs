//! Scale/rotation grid search over edge maps.
//!
//! Rotation is the expensive outer dimension (each angle re-renders the full
//! edge map), so angles fan out across the worker pool; the scale loop inside
//! an angle stays sequential. Every task reads the same shared edge map and
//! returns a pure per-angle best, reduced to the global first-seen maximum.

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use rayon::prelude::*;

use super::config::SearchConfig;
use super::ncc::{self, TemplatePlan};
use crate::DetectionResult;

/// Best match found within one rotation angle.
#[derive(Debug, Clone, Copy)]
struct AngleCandidate {
    score: f32,
    x: u32,
    y: u32,
    ratio: f64,
    scale: f64,
    angle: f64,
}

/// Search the full angle/scale grid and return the best detection.
///
/// All angles failing (every scale resized the photo below the template
/// size) is not an error: the result carries zero confidence and the caller's
/// confidence gate rejects it.
pub(crate) fn search(
    photo_edges: &GrayImage,
    plan: &TemplatePlan,
    config: &SearchConfig,
) -> DetectionResult {
    let per_angle: Vec<Option<AngleCandidate>> = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
    {
        Ok(pool) => pool.install(|| {
            config
                .angles
                .par_iter()
                .map(|&angle| search_angle(photo_edges, plan, &config.scales, angle))
                .collect()
        }),
        Err(err) => {
            tracing::warn!(error = %err, "worker pool unavailable; scanning angles sequentially");
            config
                .angles
                .iter()
                .map(|&angle| search_angle(photo_edges, plan, &config.scales, angle))
                .collect()
        }
    };

    let mut best: Option<AngleCandidate> = None;
    for candidate in per_angle.into_iter().flatten() {
        if best.map_or(true, |b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }

    match best {
        Some(c) => {
            tracing::debug!(
                angle = c.angle,
                scale = c.scale,
                confidence = c.score,
                "card template matched"
            );
            DetectionResult {
                x: c.x,
                y: c.y,
                ratio: c.ratio,
                scale: c.scale,
                angle: c.angle,
                confidence: c.score,
            }
        }
        None => {
            tracing::warn!("template larger than search region at every scale and angle");
            DetectionResult::empty()
        }
    }
}

/// Evaluate all scales for one rotation angle.
fn search_angle(
    photo_edges: &GrayImage,
    plan: &TemplatePlan,
    scales: &[f64],
    angle: f64,
) -> Option<AngleCandidate> {
    let rotated;
    let working = if angle == 0.0 {
        photo_edges
    } else {
        rotated = rotate_about_center(
            photo_edges,
            angle.to_radians() as f32,
            Interpolation::Bilinear,
            Luma([0u8]),
        );
        &rotated
    };

    let (rot_w, rot_h) = working.dimensions();
    let mut best: Option<AngleCandidate> = None;
    for &scale in scales {
        let target_w = (f64::from(rot_w) * scale).round() as u32;
        if target_w == 0 {
            break;
        }
        // Preserve aspect ratio from the target width.
        let target_h = (f64::from(rot_h) * f64::from(target_w) / f64::from(rot_w)).round() as u32;

        // Scales are expected in decreasing order of resulting size: once the
        // photo falls below the template no later scale is tried.
        if target_w < plan.width() || target_h < plan.height() {
            break;
        }

        let resized = image::imageops::resize(
            working,
            target_w,
            target_h,
            image::imageops::FilterType::Triangle,
        );
        let ratio = f64::from(rot_w) / f64::from(target_w);

        if let Some(peak) = ncc::scan(&resized, plan) {
            if best.map_or(true, |b| peak.score > b.score) {
                best = Some(AngleCandidate {
                    score: peak.score,
                    x: peak.x,
                    y: peak.y,
                    ratio,
                    scale,
                    angle,
                });
            }
        }
    }
    best
}
