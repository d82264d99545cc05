//! Per-photo correction pipeline.
//!
//! This module is the glue layer between the sampling, orientation, fitting
//! and application stages. Per photo the decision sequence is:
//!
//! 1. Sample patch colors from the located card crop.
//! 2. Damage gate: any patch dispersion above the threshold ends processing.
//! 3. Orientation: detect and undo a 180-degree rotated card.
//! 4. Fit the correction model with bounded adaptive retry.
//! 5. Error gate: only sufficiently accurate fits are applied to the photo.
//!
//! Damaged, low-confidence and high-error photos are skipped with the reason
//! recorded in the diagnostics, never dropped silently.

use image::RgbImage;

use crate::card_layout::CardLayout;
use crate::model::{correct_image, fit_model_with_retry, FitConfig};
use crate::orientation::resolve_orientation;
use crate::sampler::{sample_patches, SampleError};

/// Gates and fit controls for the correction pipeline.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// A patch dispersion strictly above this marks the card damaged.
    pub damage_threshold: f64,
    /// Fits at or above this error percentage are not applied.
    pub max_error_percent: f64,
    /// Model selection, solver and retry controls.
    pub fit: FitConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            damage_threshold: 90.0,
            max_error_percent: 50.0,
            fit: FitConfig::default(),
        }
    }
}

/// Per-photo correction diagnostics.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CorrectionDiagnostics {
    /// Card failed the dispersion damage gate; nothing was fitted.
    pub damaged: bool,
    /// Card was sampled 180 degrees rotated and reversed before fitting.
    pub rotated: bool,
    /// Fit error as a percentage of full channel range (0 when damaged).
    pub error_percent: f64,
    /// Fit attempts spent, retries included (0 when damaged).
    pub fit_attempts: usize,
}

/// Result of correcting one photo.
#[derive(Debug, Clone)]
pub struct CorrectionOutcome {
    pub diagnostics: CorrectionDiagnostics,
    /// The corrected photo; `None` when a gate rejected the card.
    pub corrected: Option<RgbImage>,
}

/// Whether any patch dispersion crosses the damage threshold (strictly).
fn exceeds_damage_threshold(dispersion: &[f64], threshold: f64) -> bool {
    dispersion.iter().any(|&d| d > threshold)
}

/// Whether a fit error percentage is good enough to apply (strictly below).
fn accepts_error(error_percent: f64, max_error_percent: f64) -> bool {
    error_percent < max_error_percent
}

/// Run the full correction pipeline for one photo.
///
/// `card` is the located card crop, `detection_confidence` the template
/// match score feeding the retry policy, `photo` the full-resolution image
/// the correction is applied to.
pub fn correct_photo(
    photo: &RgbImage,
    card: &RgbImage,
    detection_confidence: f32,
    layout: &CardLayout,
    config: &PipelineConfig,
) -> Result<CorrectionOutcome, SampleError> {
    let mut samples = sample_patches(card, layout.grid_cols, layout.grid_rows)?;

    if exceeds_damage_threshold(&samples.dispersion, config.damage_threshold) {
        tracing::warn!("card appears damaged; skipping color correction");
        return Ok(CorrectionOutcome {
            diagnostics: CorrectionDiagnostics {
                damaged: true,
                rotated: false,
                error_percent: 0.0,
                fit_attempts: 0,
            },
            corrected: None,
        });
    }

    let rotated = resolve_orientation(
        &mut samples,
        &layout.orientation_cues,
        layout.min_orientation_votes,
    );

    let fit = fit_model_with_retry(
        layout.reference_colors(),
        &samples.colors,
        detection_confidence,
        &config.fit,
    );
    tracing::debug!(
        error_percent = fit.error_percent,
        attempts = fit.attempts,
        "correction model fitted"
    );

    let corrected = if accepts_error(fit.error_percent, config.max_error_percent) {
        Some(correct_image(photo, &fit.model))
    } else {
        tracing::warn!(
            error_percent = fit.error_percent,
            "correction unsatisfactory; corrected image withheld"
        );
        None
    };

    Ok(CorrectionOutcome {
        diagnostics: CorrectionDiagnostics {
            damaged: false,
            rotated,
            error_percent: fit.error_percent,
            fit_attempts: fit.attempts,
        },
        corrected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{draw_card_image, embed_in_background};
    use crate::{CardDetector, CardTemplate, EdgeConfig, SearchConfig};
    use image::Rgb;

    #[test]
    fn damage_threshold_is_strict() {
        let threshold = 90.0;
        assert!(!exceeds_damage_threshold(&[90.0; 24], threshold));
        let mut one_bad = [90.0; 24];
        one_bad[7] = 91.0;
        assert!(exceeds_damage_threshold(&one_bad, threshold));
    }

    #[test]
    fn error_gate_rejects_exactly_fifty() {
        assert!(!accepts_error(50.0, 50.0));
        assert!(accepts_error(49.99, 50.0));
    }

    #[test]
    fn clean_synthetic_card_corrects_with_near_zero_error() {
        let layout = CardLayout::default();
        let card = draw_card_image(
            10,
            10,
            layout.grid_cols,
            layout.grid_rows,
            layout.reference_colors(),
        );
        let photo = card.clone();

        let outcome =
            correct_photo(&photo, &card, 1.0, &layout, &PipelineConfig::default()).unwrap();
        let d = &outcome.diagnostics;
        assert!(!d.damaged);
        assert!(!d.rotated);
        assert!(d.error_percent < 1.0, "error {}", d.error_percent);

        let corrected = outcome.corrected.expect("accurate fit should be applied");
        for (src, dst) in photo.pixels().zip(corrected.pixels()) {
            for ch in 0..3 {
                let diff = i32::from(src[ch]) - i32::from(dst[ch]);
                assert!(diff.abs() <= 2, "pixel moved by {}", diff);
            }
        }
    }

    #[test]
    fn rotated_card_is_reported_and_still_corrected() {
        let layout = CardLayout::default();
        let reversed: Vec<[f64; 3]> = layout.reference_colors().iter().rev().copied().collect();
        let card = draw_card_image(10, 10, layout.grid_cols, layout.grid_rows, &reversed);

        let outcome =
            correct_photo(&card, &card, 1.0, &layout, &PipelineConfig::default()).unwrap();
        let d = &outcome.diagnostics;
        assert!(d.rotated);
        assert!(!d.damaged);
        assert!(d.error_percent < 1.0, "error {}", d.error_percent);
    }

    #[test]
    fn speckled_card_is_gated_as_damaged() {
        let layout = CardLayout::default();
        let mut card = draw_card_image(
            10,
            10,
            layout.grid_cols,
            layout.grid_rows,
            layout.reference_colors(),
        );
        // Shred the first patch's sampling window with alternating extremes.
        for y in 3..7 {
            for x in 3..7 {
                let v = if (x + y) % 2 == 0 { 0 } else { 255 };
                card.put_pixel(x, y, Rgb([v, v, v]));
            }
        }

        let outcome =
            correct_photo(&card, &card, 1.0, &layout, &PipelineConfig::default()).unwrap();
        let d = &outcome.diagnostics;
        assert!(d.damaged);
        assert!(!d.rotated);
        assert_eq!(d.error_percent, 0.0);
        assert_eq!(d.fit_attempts, 0);
        assert!(outcome.corrected.is_none());
    }

    #[test]
    fn detect_locate_correct_roundtrip_on_a_synthetic_photo() {
        let layout = CardLayout::default();
        let card = draw_card_image(
            10,
            10,
            layout.grid_cols,
            layout.grid_rows,
            layout.reference_colors(),
        );
        let photo = embed_in_background(&card, 140, 100, 35, 28);

        let template = CardTemplate::from_edge_map(crate::edges::edge_map(
            &crate::edges::to_grayscale(&card),
            &EdgeConfig::default(),
        ));
        let config = SearchConfig {
            scales: vec![1.0],
            angles: vec![0.0],
            threads: 1,
            ..SearchConfig::default()
        };
        let detector = CardDetector::with_config(template, config);

        let detection = detector.detect(&photo);
        assert!(detection.is_confident(0.3), "confidence {}", detection.confidence);
        assert_eq!(detection.angle, 0.0);

        let crop = detector.locate(&photo, &detection).expect("card crop");
        let outcome = correct_photo(
            &photo,
            &crop,
            detection.confidence,
            &layout,
            &PipelineConfig::default(),
        )
        .unwrap();

        let d = &outcome.diagnostics;
        assert!(!d.damaged);
        assert!(!d.rotated);
        assert!(d.error_percent < 2.0, "error {}", d.error_percent);

        let corrected = outcome.corrected.expect("clean card should be corrected");
        for (src, dst) in photo.pixels().zip(corrected.pixels()) {
            for ch in 0..3 {
                let diff = i32::from(src[ch]) - i32::from(dst[ch]);
                assert!(diff.abs() <= 3, "pixel moved by {}", diff);
            }
        }
    }

    #[test]
    fn high_error_fit_withholds_the_corrected_image() {
        let layout = CardLayout::default();
        let card = draw_card_image(
            10,
            10,
            layout.grid_cols,
            layout.grid_rows,
            layout.reference_colors(),
        );
        // Any nonzero error fails a zero error gate, so the diagnostics are
        // still produced while the corrected image is withheld.
        let config = PipelineConfig {
            max_error_percent: 0.0,
            ..PipelineConfig::default()
        };

        let outcome = correct_photo(&card, &card, 1.0, &layout, &config).unwrap();
        let d = &outcome.diagnostics;
        assert!(!d.damaged);
        assert!(d.fit_attempts >= 1);
        assert!(outcome.corrected.is_none());
    }
}
