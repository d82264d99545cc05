//! Card template preparation.
//!
//! A raw template scan is normalized once per run: rotated to landscape,
//! resized so the card is a fixed nominal height, then edge-filtered. The
//! resize factor is kept as `photo_prescale` so callers can bring photos into
//! the same working resolution before searching.

use image::{DynamicImage, GrayImage};

use crate::edges::{self, EdgeConfig};

/// Template normalization parameters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Card height in working pixels after normalization.
    pub nominal_height: u32,
    /// Edge detector thresholds, shared with the photo side of the search.
    pub edge: EdgeConfig,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            nominal_height: 100,
            edge: EdgeConfig::default(),
        }
    }
}

/// Errors from template preparation.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// Template image has a zero dimension.
    EmptyTemplate,
    /// Normalization produced a degenerate working size.
    DegenerateNominalSize {
        /// Requested nominal height.
        nominal_height: u32,
    },
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTemplate => write!(f, "template image is empty"),
            Self::DegenerateNominalSize { nominal_height } => {
                write!(f, "nominal height {} yields an empty template", nominal_height)
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// An edge-filtered card template at working resolution.
#[derive(Debug, Clone)]
pub struct CardTemplate {
    edges: GrayImage,
    photo_prescale: f64,
}

impl CardTemplate {
    /// Normalize a raw template image.
    ///
    /// Portrait scans are rotated to landscape before scaling, matching the
    /// landscape card designs the reference tables describe.
    pub fn prepare(image: &DynamicImage, config: &TemplateConfig) -> Result<Self, TemplateError> {
        let mut gray = image.to_luma8();
        let (w, h) = gray.dimensions();
        if w == 0 || h == 0 {
            return Err(TemplateError::EmptyTemplate);
        }
        if h > w {
            gray = image::imageops::rotate90(&gray);
        }

        let (w, h) = gray.dimensions();
        if config.nominal_height == 0 {
            return Err(TemplateError::DegenerateNominalSize {
                nominal_height: config.nominal_height,
            });
        }
        let photo_prescale = f64::from(config.nominal_height) / f64::from(h);
        let target_w = (f64::from(w) * photo_prescale).round() as u32;
        if target_w == 0 {
            return Err(TemplateError::DegenerateNominalSize {
                nominal_height: config.nominal_height,
            });
        }
        let resized = image::imageops::resize(
            &gray,
            target_w,
            config.nominal_height,
            image::imageops::FilterType::Triangle,
        );

        Ok(Self {
            edges: edges::edge_map(&resized, &config.edge),
            photo_prescale,
        })
    }

    /// Wrap an already edge-filtered template without rescaling.
    pub fn from_edge_map(edges: GrayImage) -> Self {
        Self {
            edges,
            photo_prescale: 1.0,
        }
    }

    /// Edge map at working resolution.
    pub fn edges(&self) -> &GrayImage {
        &self.edges
    }

    /// Template width in working pixels.
    pub fn width(&self) -> u32 {
        self.edges.width()
    }

    /// Template height in working pixels.
    pub fn height(&self) -> u32 {
        self.edges.height()
    }

    /// Factor that brings photos into the template's working resolution.
    pub fn photo_prescale(&self) -> f64 {
        self.photo_prescale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{GrayImage, Luma};

    fn checkered(w: u32, h: u32) -> DynamicImage {
        let mut img = GrayImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = if (x / 8 + y / 8) % 2 == 0 { 230 } else { 30 };
                img.put_pixel(x, y, Luma([v]));
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn landscape_template_scales_to_nominal_height() {
        let tpl = CardTemplate::prepare(&checkered(300, 200), &TemplateConfig::default()).unwrap();
        assert_eq!(tpl.height(), 100);
        assert_eq!(tpl.width(), 150);
        assert_relative_eq!(tpl.photo_prescale(), 0.5);
    }

    #[test]
    fn portrait_template_is_rotated_to_landscape() {
        let tpl = CardTemplate::prepare(&checkered(200, 300), &TemplateConfig::default()).unwrap();
        assert_eq!(tpl.height(), 100);
        assert_eq!(tpl.width(), 150);
    }

    #[test]
    fn empty_template_is_rejected() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        let err = CardTemplate::prepare(&img, &TemplateConfig::default()).unwrap_err();
        assert_eq!(err, TemplateError::EmptyTemplate);
    }
}
