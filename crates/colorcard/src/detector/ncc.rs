//! Scalar zero-mean normalized cross-correlation scan.
//!
//! Template statistics (zero-mean kernel, variance) are precomputed once per
//! search; each placement then needs one dot product plus the window's sum
//! and sum-of-squares. Scores lie in `[-1, 1]`; flat windows are skipped via
//! a minimum-variance guard instead of dividing by ~0.

use image::GrayImage;

const MIN_WINDOW_VARIANCE: f32 = 1e-8;

/// Precomputed template statistics for repeated scans.
#[derive(Debug, Clone)]
pub(crate) struct TemplatePlan {
    width: u32,
    height: u32,
    /// Zero-mean template values, row-major.
    t_prime: Vec<f32>,
    /// Sum of squared zero-mean template values.
    var_t: f32,
}

impl TemplatePlan {
    pub(crate) fn new(template: &GrayImage) -> Self {
        let (width, height) = template.dimensions();
        let raw = template.as_raw();
        let n = raw.len().max(1) as f32;
        let mean = raw.iter().map(|&v| f32::from(v)).sum::<f32>() / n;
        let t_prime: Vec<f32> = raw.iter().map(|&v| f32::from(v) - mean).collect();
        let var_t = t_prime.iter().map(|t| t * t).sum();
        Self {
            width,
            height,
            t_prime,
            var_t,
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }
}

/// Best-scoring placement of a template inside an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Peak {
    /// Top-left x of the placement.
    pub x: u32,
    /// Top-left y of the placement.
    pub y: u32,
    /// Correlation score.
    pub score: f32,
}

/// Scan every placement and return the first-seen maximum.
///
/// Returns `None` when the image is smaller than the template or when the
/// template/image windows carry no variance anywhere.
pub(crate) fn scan(image: &GrayImage, plan: &TemplatePlan) -> Option<Peak> {
    let (img_w, img_h) = image.dimensions();
    if img_w < plan.width || img_h < plan.height || plan.var_t <= MIN_WINDOW_VARIANCE {
        return None;
    }

    let raw = image.as_raw();
    let stride = img_w as usize;
    let tpl_w = plan.width as usize;
    let tpl_h = plan.height as usize;
    let max_x = img_w - plan.width;
    let max_y = img_h - plan.height;

    let mut best: Option<Peak> = None;
    for y in 0..=max_y {
        for x in 0..=max_x {
            let mut dot = 0.0f32;
            let mut sum_i = 0.0f32;
            let mut sum_i2 = 0.0f32;

            for ty in 0..tpl_h {
                let row_base = (y as usize + ty) * stride + x as usize;
                let tpl_base = ty * tpl_w;
                for tx in 0..tpl_w {
                    let value = f32::from(raw[row_base + tx]);
                    dot += plan.t_prime[tpl_base + tx] * value;
                    sum_i += value;
                    sum_i2 += value * value;
                }
            }

            let n = (tpl_w * tpl_h) as f32;
            let var_i = sum_i2 - (sum_i * sum_i) / n;
            if var_i <= MIN_WINDOW_VARIANCE {
                continue;
            }

            let score = dot / (plan.var_t * var_i).sqrt();
            if score.is_finite() && best.map_or(true, |b| score > b.score) {
                best = Some(Peak { x, y, score });
            }
        }
    }
    best
}
