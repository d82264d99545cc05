//! Nonlinear least-squares estimation of correction model coefficients.
//!
//! The fit minimizes the summed squared per-patch color distance between
//! mapped observations and the ground-truth reference table, starting from
//! the identity transform. Occasionally the optimizer lands in a poor local
//! minimum even though detection was confident; in that case the observed
//! colors are perturbed with sub-quantization noise and the fit restarts
//! from scratch, a bounded number of times.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{error_percent, CorrectionModel, ModelKind};

/// Solver and retry controls for model fitting.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Which model equations to fit.
    pub kind: ModelKind,
    /// Levenberg-Marquardt iteration cap per attempt.
    pub max_iterations: usize,
    /// Adaptive retry controls.
    pub retry: RetryConfig,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::MatrixGamma,
            max_iterations: 1000,
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded retry policy for poorly converged fits.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total fit attempts allowed, first attempt included.
    pub max_attempts: usize,
    /// Mean patch error above which a confident detection refits.
    pub mean_error_threshold: f64,
    /// Detection confidence below which retrying is pointless.
    pub min_confidence: f32,
    /// Seed for the perturbation noise source.
    pub seed: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            mean_error_threshold: 40.0,
            min_confidence: 0.4,
            seed: 17,
        }
    }
}

/// Result of one fitting run (including any retries).
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    /// Best-effort fitted model.
    pub model: CorrectionModel,
    /// Mean per-patch Euclidean color error of the final attempt.
    pub mean_error: f64,
    /// `mean_error` as a percentage of full channel range, 2 decimals.
    pub error_percent: f64,
    /// Number of fit attempts performed.
    pub attempts: usize,
}

/// One patch's 3-channel residual block.
#[derive(Debug, Clone)]
struct PatchResidual {
    kind: ModelKind,
    reference: [f64; 3],
    observed: [f64; 3],
}

impl<T: nalgebra::RealField> tiny_solver::factors::Factor<T> for PatchResidual {
    fn residual_func(
        &self,
        params: &[nalgebra::DVector<T>],
    ) -> nalgebra::DVector<T> {
        let p = &params[0];
        let full_range = T::from_f64(255.0).unwrap();
        let obs: [T; 3] = std::array::from_fn(|j| T::from_f64(self.observed[j]).unwrap());

        let mut residuals = Vec::with_capacity(3);
        for j in 0..3 {
            let mapped = match self.kind {
                ModelKind::DiagonalGamma => {
                    let alpha = p[j].clone();
                    let beta = p[3 + j].clone();
                    let gamma = p[6 + j].clone().abs();
                    // A zero channel stays zero under any exponent; skipping
                    // powf keeps the jacobian finite at the zero base.
                    let powed = if self.observed[j] > 0.0 {
                        obs[j].clone().powf(gamma)
                    } else {
                        T::zero()
                    };
                    alpha * powed + beta
                }
                ModelKind::MatrixGamma => {
                    let mixed = p[3 * j].clone() * obs[0].clone()
                        + p[3 * j + 1].clone() * obs[1].clone()
                        + p[3 * j + 2].clone() * obs[2].clone()
                        + p[9 + j].clone();
                    let clipped = mixed.max(T::zero());
                    let gamma = p[12 + j].clone().abs();
                    if clipped > T::zero() {
                        full_range.clone() * (clipped / full_range.clone()).powf(gamma)
                    } else {
                        T::zero()
                    }
                }
            };
            residuals.push(mapped - T::from_f64(self.reference[j]).unwrap());
        }
        nalgebra::DVector::<T>::from_vec(residuals)
    }
}

/// Fit model coefficients for one set of observed patch colors.
///
/// Never fails: when the solver cannot improve on the seed (degenerate
/// samples, non-finite parameters) the identity transform is returned and
/// the downstream error gate rejects the photo.
pub fn fit_model(
    reference: &[[f64; 3]],
    observed: &[[f64; 3]],
    config: &FitConfig,
) -> FitOutcome {
    use tiny_solver::Optimizer;

    let seed = CorrectionModel::identity(config.kind);

    let mut problem = tiny_solver::Problem::new();
    for (r, o) in reference.iter().zip(observed) {
        problem.add_residual_block(
            3,
            &["p"],
            Box::new(PatchResidual {
                kind: config.kind,
                reference: *r,
                observed: *o,
            }),
            None,
        );
    }

    let mut initial_values = HashMap::<String, nalgebra::DVector<f64>>::new();
    initial_values.insert(
        "p".to_string(),
        nalgebra::DVector::<f64>::from_vec(seed.to_parameters()),
    );

    let optimizer = tiny_solver::LevenbergMarquardtOptimizer::default();
    let options = tiny_solver::OptimizerOptions {
        max_iteration: config.max_iterations.clamp(1, 20000),
        verbosity_level: 0,
        ..Default::default()
    };
    let refined = optimizer
        .optimize(&problem, &initial_values, Some(options))
        .and_then(|mut values| values.remove("p"));

    let model = match refined {
        Some(p) if p.len() == config.kind.parameter_count() && p.iter().all(|v| v.is_finite()) => {
            CorrectionModel::from_parameters(config.kind, p.as_slice())
        }
        _ => {
            tracing::warn!("color model fit did not converge; keeping identity seed");
            seed
        }
    };

    let mean_error = model.mean_error(reference, observed);
    FitOutcome {
        error_percent: error_percent(mean_error),
        model,
        mean_error,
        attempts: 1,
    }
}

/// Fit with the adaptive retry policy.
///
/// A retry is triggered only while detection confidence clears
/// `retry.min_confidence`, the mean error stays above
/// `retry.mean_error_threshold`, and the attempt budget is not exhausted.
/// Every retry perturbs the *original* observations with independent
/// uniform noise in `[0, 1)` and refits from the identity seed.
pub fn fit_model_with_retry(
    reference: &[[f64; 3]],
    observed: &[[f64; 3]],
    detection_confidence: f32,
    config: &FitConfig,
) -> FitOutcome {
    let mut rng = StdRng::seed_from_u64(config.retry.seed);
    let mut working: Vec<[f64; 3]> = observed.to_vec();
    let mut attempts = 0usize;

    loop {
        attempts += 1;
        let mut outcome = fit_model(reference, &working, config);
        outcome.attempts = attempts;

        let retry = detection_confidence > config.retry.min_confidence
            && outcome.mean_error > config.retry.mean_error_threshold
            && attempts < config.retry.max_attempts;
        if !retry {
            return outcome;
        }

        tracing::debug!(
            attempt = attempts,
            mean_error = outcome.mean_error,
            "correction error high; perturbing samples and refitting"
        );
        working = observed
            .iter()
            .map(|patch| std::array::from_fn(|j| patch[j] + rng.gen::<f64>()))
            .collect();
    }
}
