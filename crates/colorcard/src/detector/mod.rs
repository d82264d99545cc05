//! Card detection: edge filtering, scale/rotation search, region recovery.

mod config;
mod locate;
mod ncc;
mod search;

pub use config::{linspace, SearchConfig};

use image::RgbImage;

use crate::edges;
use crate::template::CardTemplate;
use crate::DetectionResult;

/// Primary detection interface.
///
/// Wraps a normalized card template and a [`SearchConfig`]. Create once,
/// detect on many photos.
pub struct CardDetector {
    template: CardTemplate,
    config: SearchConfig,
}

impl CardDetector {
    /// Create a detector with the default search configuration.
    pub fn new(template: CardTemplate) -> Self {
        Self {
            template,
            config: SearchConfig::default(),
        }
    }

    /// Create a detector with full configuration control.
    pub fn with_config(template: CardTemplate, config: SearchConfig) -> Self {
        Self { template, config }
    }

    /// Access the current configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut SearchConfig {
        &mut self.config
    }

    /// The normalized template this detector searches for.
    pub fn template(&self) -> &CardTemplate {
        &self.template
    }

    /// Find the card's position, scale and rotation in a photo.
    ///
    /// The photo must already be at the template's working resolution (see
    /// [`CardTemplate::photo_prescale`]).
    pub fn detect(&self, photo: &RgbImage) -> DetectionResult {
        let gray = edges::to_grayscale(photo);
        let edged = edges::edge_map(&gray, &self.config.edge);
        let plan = ncc::TemplatePlan::new(self.template.edges());
        search::search(&edged, &plan, &self.config)
    }

    /// Crop the detected card region out of the photo.
    pub fn locate(&self, photo: &RgbImage, detection: &DetectionResult) -> Option<RgbImage> {
        locate::crop_card(
            photo,
            detection,
            self.template.width(),
            self.template.height(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{draw_card_image, embed_in_background};
    use crate::CardLayout;

    #[test]
    fn detect_then_locate_recovers_an_embedded_card() {
        let layout = CardLayout::default();
        let card = draw_card_image(10, 10, layout.grid_cols, layout.grid_rows, layout.reference_colors());
        let photo = embed_in_background(&card, 120, 90, 25, 20);

        let template = CardTemplate::from_edge_map(edges::edge_map(
            &edges::to_grayscale(&card),
            &crate::edges::EdgeConfig::default(),
        ));
        let mut config = SearchConfig::default();
        config.scales = vec![1.0];
        config.angles = vec![0.0];
        config.threads = 1;

        let detector = CardDetector::with_config(template, config);
        let detection = detector.detect(&photo);
        assert!(detection.is_confident(0.3), "confidence {}", detection.confidence);
        assert_eq!(detection.angle, 0.0);

        let crop = detector.locate(&photo, &detection).unwrap();
        assert_eq!(crop.dimensions(), card.dimensions());
    }
}
