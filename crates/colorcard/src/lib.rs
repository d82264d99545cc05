//! colorcard — pure-Rust color reference card detection and photo color
//! correction.
//!
//! Photographs taken under uncontrolled lighting are normalized against a
//! known reference card placed in the scene. The pipeline stages are:
//!
//! 1. **Template** – normalize the card scan: landscape, nominal height,
//!    edge filter.
//! 2. **Detect** – scale/rotation grid search of the photo's edge map by
//!    normalized cross-correlation, angles evaluated in parallel.
//! 3. **Locate** – rotate once if needed and crop the card region.
//! 4. **Sample** – robust per-patch color estimates and dispersions.
//! 5. **Orient** – detect and undo a 180-degree rotated card.
//! 6. **Fit** – nonlinear least-squares gamma-correction model with bounded
//!    adaptive retry.
//! 7. **Apply** – correct the full-resolution photo, gated on fit quality.
//!
//! # Public API
//! [`CardDetector`] and [`CardLayout`] are the primary entry points;
//! [`pipeline::correct_photo`] runs the correction stages end to end.
//! [`SearchConfig`] and [`PipelineConfig`] expose advanced tuning.

mod card_layout;
mod detector;
mod edges;
mod model;
mod orientation;
pub mod pipeline;
mod reference;
mod sampler;
mod template;
#[cfg(test)]
mod test_utils;

pub use card_layout::{CardLayout, ReferenceTable};
pub use detector::{linspace, CardDetector, SearchConfig};
pub use edges::EdgeConfig;
pub use model::{
    correct_image, error_percent, fit_model, fit_model_with_retry, CorrectionModel, FitConfig,
    FitOutcome, ModelKind, RetryConfig, UnsupportedAlgorithm,
};
pub use orientation::{OrientationCue, SumRelation};
pub use pipeline::{CorrectionDiagnostics, CorrectionOutcome, PipelineConfig};
pub use reference::{CAMERA_TRAX_RGB, REFERENCE_PATCHES, X_RITE_RGB};
pub use sampler::{sample_patches, ColorSamples, SampleError};
pub use template::{CardTemplate, TemplateConfig, TemplateError};

/// Best template match for a single photo.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectionResult {
    /// Matched top-left x in the resized search space.
    pub x: u32,
    /// Matched top-left y in the resized search space.
    pub y: u32,
    /// Factor mapping search-space coordinates back to photo pixels.
    pub ratio: f64,
    /// Template scale factor that produced the match.
    pub scale: f64,
    /// Rotation angle in degrees that produced the match.
    pub angle: f64,
    /// Normalized cross-correlation peak value.
    pub confidence: f32,
}

impl DetectionResult {
    /// A failed detection: zero confidence, degenerate geometry.
    pub fn empty() -> Self {
        Self {
            x: 0,
            y: 0,
            ratio: 0.0,
            scale: 0.0,
            angle: 0.0,
            confidence: 0.0,
        }
    }

    /// Whether the match clears a caller-side confidence gate (strictly).
    pub fn is_confident(&self, min_confidence: f32) -> bool {
        self.confidence > min_confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_detection_is_never_confident() {
        let det = DetectionResult::empty();
        assert!(!det.is_confident(0.0));
        assert!(!det.is_confident(0.3));
    }

    #[test]
    fn confidence_gate_is_strict() {
        let mut det = DetectionResult::empty();
        det.confidence = 0.3;
        assert!(!det.is_confident(0.3));
        det.confidence = 0.31;
        assert!(det.is_confident(0.3));
    }

    #[test]
    fn detection_result_serializes() {
        let mut det = DetectionResult::empty();
        det.confidence = 0.85;
        det.ratio = 2.0;
        let json = serde_json::to_string(&det).unwrap();
        let back: DetectionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, det);
    }
}
