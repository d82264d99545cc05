//! Search configuration for card detection.

use crate::edges::EdgeConfig;

/// Scale/rotation search grid and execution controls.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Candidate template scale factors, tried in the given order.
    ///
    /// The scale loop stops for an angle as soon as a resize makes the photo
    /// smaller than the template, so callers should order scales by
    /// decreasing resulting image size; later larger-size scales would be
    /// skipped silently.
    pub scales: Vec<f64>,
    /// Candidate rotation angles in degrees, tried in the given order.
    pub angles: Vec<f64>,
    /// Edge detector thresholds applied to photos before matching.
    pub edge: EdgeConfig,
    /// Worker threads for the per-angle search; 0 uses all available cores.
    pub threads: usize,
    /// Detections at or below this confidence are not worth correcting.
    pub min_confidence: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            scales: vec![1.0],
            angles: linspace(-2.5, 2.5, 11),
            edge: EdgeConfig::default(),
            threads: 0,
            min_confidence: 0.3,
        }
    }
}

/// `count` evenly spaced values from `lo` to `hi` inclusive.
///
/// A single-element grid collapses to `lo`, mirroring the way range options
/// degrade to a fixed value.
pub fn linspace(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (count - 1) as f64;
            (0..count).map(|i| lo + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_angle_grid_includes_zero() {
        let config = SearchConfig::default();
        assert_eq!(config.angles.len(), 11);
        assert!(config.angles.iter().any(|&a| a == 0.0));
        assert_relative_eq!(config.angles[0], -2.5);
        assert_relative_eq!(config.angles[10], 2.5);
    }

    #[test]
    fn linspace_endpoints_and_step() {
        let grid = linspace(0.9, 1.1, 5);
        assert_eq!(grid.len(), 5);
        assert_relative_eq!(grid[0], 0.9);
        assert_relative_eq!(grid[2], 1.0);
        assert_relative_eq!(grid[4], 1.1);
    }

    #[test]
    fn linspace_degenerate_counts() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(0.95, 1.05, 1), vec![0.95]);
    }
}
