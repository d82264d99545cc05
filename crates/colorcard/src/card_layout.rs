//! Runtime card layout specification.
//!
//! Layout JSON follows a parametric schema (`colorcard.layout.v1`): grid
//! geometry, the ground-truth reference table (one of the embedded vendor
//! tables or explicit per-patch values), and the orientation cue table used
//! to detect 180-degree rotated cards.

use std::path::Path;

use crate::orientation::{OrientationCue, SumRelation};
use crate::reference::{CAMERA_TRAX_RGB, X_RITE_RGB};

const LAYOUT_SCHEMA_V1: &str = "colorcard.layout.v1";

const DEFAULT_NAME: &str = "camera_trax_6x4";
const DEFAULT_GRID_COLS: usize = 6;
const DEFAULT_GRID_ROWS: usize = 4;
const DEFAULT_MIN_VOTES: usize = 2;

/// Named embedded reference tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceTable {
    CameraTrax,
    XRite,
}

impl ReferenceTable {
    /// Ground-truth patch colors in canonical order.
    pub fn colors(self) -> &'static [[f64; 3]] {
        match self {
            Self::CameraTrax => &CAMERA_TRAX_RGB,
            Self::XRite => &X_RITE_RGB,
        }
    }
}

/// Runtime card layout used by the sampler, orientation resolver and fitter.
#[derive(Debug, Clone)]
pub struct CardLayout {
    pub name: String,
    /// Number of patch columns.
    pub grid_cols: usize,
    /// Number of patch rows.
    pub grid_rows: usize,
    /// Ground-truth colors, canonical row-major patch order.
    reference_colors: Vec<[f64; 3]>,
    /// Patch-pair comparisons that indicate a 180-degree rotated card.
    pub orientation_cues: Vec<OrientationCue>,
    /// Minimum number of agreeing cues required to declare the card rotated.
    pub min_orientation_votes: usize,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct CardLayoutSpecV1 {
    schema: String,
    name: String,
    grid_cols: usize,
    grid_rows: usize,
    /// Embedded table name; ignored when `reference_colors` is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference: Option<ReferenceTable>,
    /// Explicit per-patch ground-truth colors, canonical order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference_colors: Option<Vec<[f64; 3]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    orientation_cues: Option<Vec<OrientationCue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_orientation_votes: Option<usize>,
}

impl CardLayout {
    /// Total number of patches on the card.
    pub fn patch_count(&self) -> usize {
        self.grid_cols * self.grid_rows
    }

    /// Ground-truth patch colors in canonical row-major order.
    pub fn reference_colors(&self) -> &[[f64; 3]] {
        &self.reference_colors
    }

    /// Build a layout for an embedded vendor table with the default 6x4 grid
    /// and default orientation cues.
    pub fn embedded(reference: ReferenceTable) -> Self {
        let name = match reference {
            ReferenceTable::CameraTrax => DEFAULT_NAME.to_string(),
            ReferenceTable::XRite => "x_rite_6x4".to_string(),
        };
        Self {
            name,
            grid_cols: DEFAULT_GRID_COLS,
            grid_rows: DEFAULT_GRID_ROWS,
            reference_colors: reference.colors().to_vec(),
            orientation_cues: default_orientation_cues(),
            min_orientation_votes: DEFAULT_MIN_VOTES,
        }
    }

    /// Load a card layout from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        let spec: CardLayoutSpecV1 = serde_json::from_str(&data)?;
        Self::from_layout_spec(spec).map_err(Into::into)
    }

    fn from_layout_spec(spec: CardLayoutSpecV1) -> Result<Self, String> {
        if spec.schema != LAYOUT_SCHEMA_V1 {
            return Err(format!(
                "unsupported layout schema '{}' (expected '{}')",
                spec.schema, LAYOUT_SCHEMA_V1
            ));
        }

        if spec.name.trim().is_empty() {
            return Err("layout name must not be empty".to_string());
        }
        if spec.grid_cols == 0 || spec.grid_rows == 0 {
            return Err("grid_cols and grid_rows must be >= 1".to_string());
        }

        let patch_count = spec.grid_cols * spec.grid_rows;
        let reference_colors = match (spec.reference_colors, spec.reference) {
            (Some(colors), _) => colors,
            (None, Some(table)) => table.colors().to_vec(),
            (None, None) => {
                return Err("layout needs either 'reference' or 'reference_colors'".to_string())
            }
        };
        if reference_colors.len() != patch_count {
            return Err(format!(
                "reference table has {} patches, grid expects {}",
                reference_colors.len(),
                patch_count
            ));
        }
        for patch in &reference_colors {
            if patch.iter().any(|v| !v.is_finite() || *v < 0.0 || *v > 255.0) {
                return Err("reference colors must be finite values in [0, 255]".to_string());
            }
        }

        let orientation_cues = spec
            .orientation_cues
            .unwrap_or_else(default_orientation_cues);
        for cue in &orientation_cues {
            if cue.lhs >= patch_count || cue.rhs >= patch_count {
                return Err(format!(
                    "orientation cue ({}, {}) out of range for {} patches",
                    cue.lhs, cue.rhs, patch_count
                ));
            }
        }
        let min_orientation_votes = spec.min_orientation_votes.unwrap_or(DEFAULT_MIN_VOTES);
        if min_orientation_votes == 0 {
            return Err("min_orientation_votes must be >= 1".to_string());
        }

        Ok(Self {
            name: spec.name,
            grid_cols: spec.grid_cols,
            grid_rows: spec.grid_rows,
            reference_colors,
            orientation_cues,
            min_orientation_votes,
        })
    }
}

impl Default for CardLayout {
    fn default() -> Self {
        Self::embedded(ReferenceTable::CameraTrax)
    }
}

/// Cue table for the 6x4 vendor cards.
///
/// In canonical order the yellow patch (15) outshines the light red (8), the
/// near-white (18) outshines the blue-green (5), and the black corner (23) is
/// darker than the first dark-skin patch (0). A reversed card flips all three
/// relations.
fn default_orientation_cues() -> Vec<OrientationCue> {
    vec![
        OrientationCue {
            lhs: 8,
            rhs: 15,
            reversed_when: SumRelation::Greater,
        },
        OrientationCue {
            lhs: 5,
            rhs: 18,
            reversed_when: SumRelation::Greater,
        },
        OrientationCue {
            lhs: 0,
            rhs: 23,
            reversed_when: SumRelation::Less,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_consistent() {
        let layout = CardLayout::default();
        assert_eq!(layout.patch_count(), 24);
        assert_eq!(layout.reference_colors().len(), 24);
        assert_eq!(layout.orientation_cues.len(), 3);
        assert_eq!(layout.min_orientation_votes, 2);
    }

    #[test]
    fn spec_roundtrip_with_embedded_table() {
        let json = format!(
            r#"{{
                "schema": "{LAYOUT_SCHEMA_V1}",
                "name": "bench_card",
                "grid_cols": 6,
                "grid_rows": 4,
                "reference": "x_rite"
            }}"#
        );
        let spec: CardLayoutSpecV1 = serde_json::from_str(&json).unwrap();
        let layout = CardLayout::from_layout_spec(spec).unwrap();
        assert_eq!(layout.name, "bench_card");
        assert_eq!(layout.reference_colors(), ReferenceTable::XRite.colors());
    }

    #[test]
    fn rejects_mismatched_reference_length() {
        let spec = CardLayoutSpecV1 {
            schema: LAYOUT_SCHEMA_V1.to_string(),
            name: "bad".to_string(),
            grid_cols: 2,
            grid_rows: 2,
            reference: None,
            reference_colors: Some(vec![[0.0, 0.0, 0.0]; 3]),
            orientation_cues: None,
            min_orientation_votes: None,
        };
        assert!(CardLayout::from_layout_spec(spec).is_err());
    }

    #[test]
    fn rejects_out_of_range_cues() {
        let spec = CardLayoutSpecV1 {
            schema: LAYOUT_SCHEMA_V1.to_string(),
            name: "bad_cues".to_string(),
            grid_cols: 2,
            grid_rows: 2,
            reference: None,
            reference_colors: Some(vec![[10.0, 10.0, 10.0]; 4]),
            orientation_cues: Some(vec![OrientationCue {
                lhs: 0,
                rhs: 4,
                reversed_when: SumRelation::Greater,
            }]),
            min_orientation_votes: None,
        };
        assert!(CardLayout::from_layout_spec(spec).is_err());
    }

    #[test]
    fn rejects_wrong_schema() {
        let spec = CardLayoutSpecV1 {
            schema: "colorcard.layout.v0".to_string(),
            name: "old".to_string(),
            grid_cols: 6,
            grid_rows: 4,
            reference: Some(ReferenceTable::CameraTrax),
            reference_colors: None,
            orientation_cues: None,
            min_orientation_votes: None,
        };
        assert!(CardLayout::from_layout_spec(spec).is_err());
    }
}
