//! Parametrized color-mapping models.
//!
//! Two gamma-correction variants are supported. The diagonal variant maps
//! each channel independently:
//!
//! ```text
//! out_j = alpha_j * in_j^gamma_j + beta_j
//! ```
//!
//! The full-matrix variant mixes channels linearly before a normalized
//! power-law stage:
//!
//! ```text
//! v = clip(A * in + b, 0, inf)
//! out_j = 255 * (v_j / 255)^gamma_j
//! ```
//!
//! Model coefficients are estimated per photo from sampled card patches and
//! discarded after the photo is corrected.

mod apply;
mod fit;

pub use apply::correct_image;
pub use fit::{fit_model, fit_model_with_retry, FitConfig, FitOutcome, RetryConfig};

use nalgebra::{Matrix3, Vector3};

/// Selects the model equations and free-parameter layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Per-channel scale + offset + exponent (9 free parameters).
    DiagonalGamma,
    /// Full 3x3 mixing matrix + offset + exponent (15 free parameters).
    MatrixGamma,
}

impl ModelKind {
    /// Number of free parameters in the flattened solver layout.
    pub fn parameter_count(self) -> usize {
        match self {
            Self::DiagonalGamma => 9,
            Self::MatrixGamma => 15,
        }
    }
}

/// Error for model names arriving over a string boundary (CLI, config).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedAlgorithm {
    /// The unrecognized model name.
    pub name: String,
}

impl std::fmt::Display for UnsupportedAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported color model '{}' (expected 'diagonal_gamma' or 'matrix_gamma')",
            self.name
        )
    }
}

impl std::error::Error for UnsupportedAlgorithm {}

impl std::str::FromStr for ModelKind {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diagonal_gamma" => Ok(Self::DiagonalGamma),
            "matrix_gamma" => Ok(Self::MatrixGamma),
            other => Err(UnsupportedAlgorithm {
                name: other.to_string(),
            }),
        }
    }
}

/// A fitted color-correction transform.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionModel {
    /// Which equations `mix`/`offset`/`gamma` parametrize.
    pub kind: ModelKind,
    /// Channel mixing matrix; diagonal for [`ModelKind::DiagonalGamma`].
    pub mix: Matrix3<f64>,
    /// Additive per-channel offset.
    pub offset: Vector3<f64>,
    /// Per-channel exponent, always non-negative.
    pub gamma: Vector3<f64>,
}

impl CorrectionModel {
    /// The identity transform for a model kind (fit seed).
    pub fn identity(kind: ModelKind) -> Self {
        Self {
            kind,
            mix: Matrix3::identity(),
            offset: Vector3::zeros(),
            gamma: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Map a single color triplet.
    pub fn map(&self, color: Vector3<f64>) -> Vector3<f64> {
        match self.kind {
            ModelKind::DiagonalGamma => Vector3::from_fn(|j, _| {
                self.mix[(j, j)] * color[j].powf(self.gamma[j]) + self.offset[j]
            }),
            ModelKind::MatrixGamma => {
                let mixed = self.mix * color + self.offset;
                Vector3::from_fn(|j, _| {
                    255.0 * (mixed[j].max(0.0) / 255.0).powf(self.gamma[j])
                })
            }
        }
    }

    /// Flatten to the solver parameter layout.
    ///
    /// Diagonal: `[alpha; 3, beta; 3, gamma; 3]`. Matrix: `[A row-major; 9,
    /// beta; 3, gamma; 3]`.
    pub fn to_parameters(&self) -> Vec<f64> {
        let mut p = Vec::with_capacity(self.kind.parameter_count());
        match self.kind {
            ModelKind::DiagonalGamma => {
                p.extend((0..3).map(|j| self.mix[(j, j)]));
            }
            ModelKind::MatrixGamma => {
                for r in 0..3 {
                    for c in 0..3 {
                        p.push(self.mix[(r, c)]);
                    }
                }
            }
        }
        p.extend(self.offset.iter());
        p.extend(self.gamma.iter());
        p
    }

    /// Rebuild a model from the solver parameter layout.
    ///
    /// The exponent slots are folded through `abs`, keeping the effective
    /// gamma non-negative whatever the raw optimization variables did.
    pub fn from_parameters(kind: ModelKind, p: &[f64]) -> Self {
        debug_assert_eq!(p.len(), kind.parameter_count());
        let (mix, rest) = match kind {
            ModelKind::DiagonalGamma => {
                (Matrix3::from_diagonal(&Vector3::new(p[0], p[1], p[2])), &p[3..])
            }
            ModelKind::MatrixGamma => (
                Matrix3::new(p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7], p[8]),
                &p[9..],
            ),
        };
        Self {
            kind,
            mix,
            offset: Vector3::new(rest[0], rest[1], rest[2]),
            gamma: Vector3::new(rest[3].abs(), rest[4].abs(), rest[5].abs()),
        }
    }

    /// Mean per-patch Euclidean color distance between mapped observations
    /// and their references.
    pub fn mean_error(&self, reference: &[[f64; 3]], observed: &[[f64; 3]]) -> f64 {
        debug_assert_eq!(reference.len(), observed.len());
        if reference.is_empty() {
            return 0.0;
        }
        let total: f64 = reference
            .iter()
            .zip(observed)
            .map(|(r, o)| {
                let mapped = self.map(Vector3::new(o[0], o[1], o[2]));
                let diff = Vector3::new(r[0], r[1], r[2]) - mapped;
                diff.norm()
            })
            .sum();
        total / reference.len() as f64
    }
}

/// Scale a mean color error to a percentage of full channel range,
/// rounded to two decimal places.
pub fn error_percent(mean_error: f64) -> f64 {
    (mean_error / 255.0 * 10000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_matrix_model_maps_colors_unchanged() {
        let model = CorrectionModel::identity(ModelKind::MatrixGamma);
        let c = Vector3::new(12.0, 180.0, 255.0);
        let out = model.map(c);
        for j in 0..3 {
            assert_relative_eq!(out[j], c[j], epsilon = 1e-12);
        }
    }

    #[test]
    fn identity_diagonal_model_maps_colors_unchanged() {
        let model = CorrectionModel::identity(ModelKind::DiagonalGamma);
        let c = Vector3::new(12.0, 180.0, 255.0);
        let out = model.map(c);
        for j in 0..3 {
            assert_relative_eq!(out[j], c[j], epsilon = 1e-12);
        }
    }

    #[test]
    fn matrix_model_clips_negative_mix_before_gamma() {
        let mut model = CorrectionModel::identity(ModelKind::MatrixGamma);
        model.offset = Vector3::new(-300.0, 0.0, 0.0);
        let out = model.map(Vector3::new(100.0, 50.0, 50.0));
        assert_relative_eq!(out[0], 0.0);
        assert_relative_eq!(out[1], 50.0);
    }

    #[test]
    fn parameter_roundtrip_preserves_model() {
        let model = CorrectionModel {
            kind: ModelKind::MatrixGamma,
            mix: Matrix3::new(1.1, 0.02, -0.01, 0.0, 0.95, 0.03, 0.01, -0.02, 1.05),
            offset: Vector3::new(2.0, -1.5, 0.5),
            gamma: Vector3::new(0.9, 1.0, 1.2),
        };
        let rebuilt = CorrectionModel::from_parameters(model.kind, &model.to_parameters());
        assert_eq!(rebuilt, model);
    }

    #[test]
    fn from_parameters_folds_gamma_through_abs() {
        let p = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, -0.8, 1.0, -1.2];
        let model = CorrectionModel::from_parameters(ModelKind::DiagonalGamma, &p);
        assert_relative_eq!(model.gamma[0], 0.8);
        assert_relative_eq!(model.gamma[2], 1.2);
    }

    #[test]
    fn model_names_parse() {
        assert_eq!("matrix_gamma".parse::<ModelKind>(), Ok(ModelKind::MatrixGamma));
        assert_eq!(
            "diagonal_gamma".parse::<ModelKind>(),
            Ok(ModelKind::DiagonalGamma)
        );
        let err = "polynomial".parse::<ModelKind>().unwrap_err();
        assert_eq!(err.name, "polynomial");
    }

    #[test]
    fn error_percent_rounds_to_two_decimals() {
        assert_relative_eq!(error_percent(127.5), 50.0);
        assert_relative_eq!(error_percent(0.0), 0.0);
        // 102.033/255 * 10000 = 4001.3 -> rounds to 4001 -> 40.01
        assert_relative_eq!(error_percent(102.033), 40.01, epsilon = 1e-9);
    }
}
