//! Patch color sampling from a cropped card image.
//!
//! Each grid cell contributes one robust color estimate (per-channel median
//! over a small centered window) and one dispersion score (per-channel
//! standard deviation, summed over channels). Dispersion feeds the damage
//! gate: a scratched or stained patch shows far more in-window spread than a
//! clean solid-color square.

use image::RgbImage;

/// Fraction of a cell's extent used as the sampling window half-extent.
const WINDOW_FRACTION: f64 = 0.2;

/// Errors from patch sampling.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleError {
    /// Grid dimensions do not partition the card into nonzero-sized cells.
    InvalidGridGeometry {
        /// Requested patch columns.
        grid_cols: usize,
        /// Requested patch rows.
        grid_rows: usize,
        /// Card image width in pixels.
        width: u32,
        /// Card image height in pixels.
        height: u32,
    },
    /// A sampling window collapsed to zero pixels.
    EmptySampleRegion {
        /// Patch row (0-based).
        row: usize,
        /// Patch column (0-based).
        col: usize,
    },
}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidGridGeometry {
                grid_cols,
                grid_rows,
                width,
                height,
            } => write!(
                f,
                "{}x{} grid does not partition a {}x{} card into nonzero cells",
                grid_cols, grid_rows, width, height
            ),
            Self::EmptySampleRegion { row, col } => {
                write!(f, "sampling window for patch ({}, {}) is empty", row, col)
            }
        }
    }
}

impl std::error::Error for SampleError {}

/// Sampled patch colors in canonical row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorSamples {
    /// Per-patch `[r, g, b]` median estimates.
    pub colors: Vec<[f64; 3]>,
    /// Per-patch summed channel standard deviations.
    pub dispersion: Vec<f64>,
}

impl ColorSamples {
    /// Reverse the patch order end-to-end (180-degree card rotation).
    pub fn reverse(&mut self) {
        self.colors.reverse();
        self.dispersion.reverse();
    }
}

/// Sample every grid cell of a cropped card image.
///
/// Cell centers are at `((col + 0.5) * width / grid_cols,
/// (row + 0.5) * height / grid_rows)`; the window half-extent per axis is
/// 20% of the cell extent, truncated to whole pixels.
pub fn sample_patches(
    card: &RgbImage,
    grid_cols: usize,
    grid_rows: usize,
) -> Result<ColorSamples, SampleError> {
    let (width, height) = card.dimensions();
    if grid_cols == 0
        || grid_rows == 0
        || (width as usize) < grid_cols
        || (height as usize) < grid_rows
    {
        return Err(SampleError::InvalidGridGeometry {
            grid_cols,
            grid_rows,
            width,
            height,
        });
    }

    let half_rows = (WINDOW_FRACTION * f64::from(height) / grid_rows as f64) as u32;
    let half_cols = (WINDOW_FRACTION * f64::from(width) / grid_cols as f64) as u32;

    let patch_count = grid_cols * grid_rows;
    let mut colors = Vec::with_capacity(patch_count);
    let mut dispersion = Vec::with_capacity(patch_count);
    let mut channel = Vec::with_capacity((2 * half_rows as usize) * (2 * half_cols as usize));

    for row in 0..grid_rows {
        for col in 0..grid_cols {
            if half_rows == 0 || half_cols == 0 {
                return Err(SampleError::EmptySampleRegion { row, col });
            }
            let cy = ((row as f64 + 0.5) * f64::from(height) / grid_rows as f64) as u32;
            let cx = ((col as f64 + 0.5) * f64::from(width) / grid_cols as f64) as u32;

            let mut patch = [0.0f64; 3];
            let mut spread = 0.0f64;
            for ch in 0..3 {
                channel.clear();
                for y in cy - half_rows..cy + half_rows {
                    for x in cx - half_cols..cx + half_cols {
                        channel.push(f64::from(card.get_pixel(x, y)[ch]));
                    }
                }
                patch[ch] = median(&mut channel);
                spread += std_dev(&channel);
            }
            colors.push(patch);
            dispersion.push(spread);
        }
    }

    Ok(ColorSamples { colors, dispersion })
}

/// Median of a nonempty slice; even counts average the two middle values.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

/// Population standard deviation of a nonempty slice.
fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    var.sqrt()
}
