use idis_core::HandwritingConfig;
use image::{DynamicImage, GrayImage};
use imageproc::edges::canny;

/// Smallest side the edge detector is run on.
const MIN_SIDE: u32 = 3;

/// Whole-image features the heuristic decides on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandwritingFeatures {
    /// Fraction of pixels flagged as edges.
    pub edge_density: f32,
    /// Population variance of pixel intensities.
    pub variance: f64,
}

/// Heuristic handwriting detector: many edges but low intensity spread.
///
/// A `true` result only means "try the handwriting engine first"; printed
/// text with heavy artifacts can be misclassified.
#[derive(Debug, Clone, Default)]
pub struct HandwritingClassifier {
    config: HandwritingConfig,
}

impl HandwritingClassifier {
    pub fn new(config: HandwritingConfig) -> Self {
        Self { config }
    }

    pub fn features(&self, image: &GrayImage) -> Option<HandwritingFeatures> {
        let (w, h) = image.dimensions();
        if w < MIN_SIDE || h < MIN_SIDE {
            return None;
        }
        let (low, high) = (self.config.canny_low, self.config.canny_high);
        // canny panics unless 0 <= low <= high.
        if !low.is_finite() || !high.is_finite() || low < 0.0 || low > high {
            tracing::warn!(low, high, "Invalid edge thresholds, skipping handwriting check");
            return None;
        }
        let total = (w as u64 * h as u64) as f64;

        let edges = canny(image, low, high);
        let edge_pixels = edges.pixels().filter(|p| p[0] > 0).count();

        let mean = image.pixels().map(|p| p[0] as f64).sum::<f64>() / total;
        let variance = image
            .pixels()
            .map(|p| {
                let d = p[0] as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / total;

        Some(HandwritingFeatures { edge_density: (edge_pixels as f64 / total) as f32, variance })
    }

    /// `false` whenever the features cannot be computed.
    pub fn is_handwritten(&self, image: &DynamicImage) -> bool {
        let gray = image.to_luma8();
        let Some(f) = self.features(&gray) else {
            tracing::debug!("Handwriting features unavailable for {}x{} image", gray.width(), gray.height());
            return false;
        };
        let handwritten = f.edge_density > self.config.edge_density_threshold
            && f.variance < self.config.variance_threshold;
        tracing::debug!(
            edge_density = f.edge_density,
            variance = f.variance,
            handwritten,
            "Handwriting classifier"
        );
        handwritten
    }
}
