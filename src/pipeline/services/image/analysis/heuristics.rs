/// Direct detectors that need no trained model.
use std::time::Instant;

use super::config::AnalysisConfig;
use super::core::{
    sample_border, sample_region, scale_to_width, AnalysisContext, DetectionResult, ImageDetector,
    ImageRegion,
};
use super::features::edge_sampling_steps;
use super::variance::color_variance;

const MIN_DIMENSION: u32 = 10;

/// Flags a uniform backdrop from the color variance of the image border.
#[derive(Debug, Clone)]
pub struct NeutralBackgroundDetector {
    max_variance: f64,
}

impl NeutralBackgroundDetector {
    pub fn new(max_variance: f64) -> Self {
        Self { max_variance }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.neutral_background_max_variance)
    }
}

impl ImageDetector for NeutralBackgroundDetector {
    type Output = bool;

    fn detect(&self, context: &AnalysisContext) -> DetectionResult<bool> {
        let start_time = Instant::now();
        let (width, height) = context.dimensions;

        if width < MIN_DIMENSION || height < MIN_DIMENSION {
            return DetectionResult::new(false, format!("image too small ({width}x{height})"))
                .with_timing(start_time);
        }

        let (step_x, step_y) = edge_sampling_steps(width, height);
        let edge_pixels = sample_border(&context.rgb, step_x, step_y);
        if edge_pixels.is_empty() {
            return DetectionResult::new(false, "no border pixels".to_string()).with_timing(start_time);
        }

        let variance = color_variance(&edge_pixels);
        DetectionResult::new(
            variance < self.max_variance,
            format!(
                "border variance {:.1} over {} pixels (threshold {})",
                variance,
                edge_pixels.len(),
                self.max_variance
            ),
        )
        .with_timing(start_time)
    }

    fn name(&self) -> &'static str {
        "NeutralBackgroundDetector"
    }
}

/// Product-only fallback used while no product-only model is trained: a busy
/// center on a quiet border looks like a product shot, a busy border like a
/// staged scene.
#[derive(Debug, Clone)]
pub struct ProductOnlyHeuristic {
    min_center_variance: f64,
    max_edge_variance: f64,
    scale_width: u32,
    sample_step: u32,
    margin_fraction: f64,
    min_dimension: u32,
}

impl ProductOnlyHeuristic {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let sampling = &config.heuristic_sampling;
        Self {
            min_center_variance: config.product_only_min_center_variance,
            max_edge_variance: config.product_only_max_edge_variance,
            scale_width: sampling.scale_width,
            sample_step: sampling.sample_step,
            margin_fraction: sampling.margin_fraction,
            min_dimension: sampling.min_dimension,
        }
    }
}

impl Default for ProductOnlyHeuristic {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl ImageDetector for ProductOnlyHeuristic {
    type Output = bool;

    fn detect(&self, context: &AnalysisContext) -> DetectionResult<bool> {
        let start_time = Instant::now();
        let (width, height) = context.dimensions;

        if width < self.min_dimension || height < self.min_dimension {
            return DetectionResult::new(false, format!("image too small ({width}x{height})"))
                .with_timing(start_time);
        }

        let resized = scale_to_width(&context.rgb, self.scale_width);
        let (width, height) = resized.dimensions();

        let center = ImageRegion::inset(width, height, self.margin_fraction);
        let center_pixels = sample_region(&resized, center, self.sample_step);
        let edge_pixels = sample_border(&resized, self.sample_step, self.sample_step);

        if center_pixels.is_empty() || edge_pixels.is_empty() {
            return DetectionResult::new(false, "not enough samples".to_string())
                .with_timing(start_time);
        }

        let center_variance = color_variance(&center_pixels);
        let edge_variance = color_variance(&edge_pixels);

        DetectionResult::new(
            center_variance > self.min_center_variance && edge_variance < self.max_edge_variance,
            format!("center variance {center_variance:.1}, edge variance {edge_variance:.1}"),
        )
        .with_timing(start_time)
    }

    fn name(&self) -> &'static str {
        "ProductOnlyHeuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};

    fn context(rgb: RgbImage) -> AnalysisContext {
        AnalysisContext::new(DynamicImage::ImageRgb8(rgb))
    }

    /// Gray frame with a black/white checkerboard of 10px cells in the center.
    fn product_shot() -> RgbImage {
        ImageBuffer::from_fn(200, 200, |x, y| {
            if (40..160).contains(&x) && (40..160).contains(&y) {
                if (x / 10 + y / 10) % 2 == 0 {
                    Rgb([0, 0, 0])
                } else {
                    Rgb([255, 255, 255])
                }
            } else {
                Rgb([128, 128, 128])
            }
        })
    }

    #[test]
    fn busy_center_on_plain_border_is_product_only() {
        let heuristic = ProductOnlyHeuristic::default();
        assert!(heuristic.detect(&context(product_shot())).result);
    }

    #[test]
    fn tall_image_center_margin_follows_width() {
        // 40px margin on both axes reaches the bands just inside the top and
        // bottom margins
        let tall = ImageBuffer::from_fn(200, 400, |x, y| {
            let in_band = (40..80).contains(&y) || (320..360).contains(&y);
            if (40..160).contains(&x) && in_band {
                if (x / 10 + y / 10) % 2 == 0 {
                    Rgb([0, 0, 0])
                } else {
                    Rgb([255, 255, 255])
                }
            } else {
                Rgb([128, 128, 128])
            }
        });
        let detection = ProductOnlyHeuristic::default().detect(&context(tall));
        assert!(detection.result, "{}", detection.reasoning);
    }

    #[test]
    fn uniform_image_is_not_product_only() {
        let heuristic = ProductOnlyHeuristic::default();
        let uniform = RgbImage::from_pixel(200, 200, Rgb([240, 240, 240]));
        assert!(!heuristic.detect(&context(uniform)).result);
    }

    #[test]
    fn busy_border_is_not_product_only() {
        let heuristic = ProductOnlyHeuristic::default();
        let noisy = ImageBuffer::from_fn(200, 200, |x, y| {
            if (x / 10 + y / 10) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        assert!(!heuristic.detect(&context(noisy)).result);
    }

    #[test]
    fn plain_border_is_neutral_background() {
        let detector = NeutralBackgroundDetector::from_config(&AnalysisConfig::default());
        assert!(detector.detect(&context(product_shot())).result);
    }

    #[test]
    fn striped_border_is_not_neutral() {
        let detector = NeutralBackgroundDetector::new(500.0);
        let striped = ImageBuffer::from_fn(100, 100, |x, _| {
            if (x / 10) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        // 10px stripes alternate at the 10px border stride
        assert!(!detector.detect(&context(striped)).result);
    }

    #[test]
    fn tiny_images_are_never_flagged() {
        let tiny = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        assert!(!NeutralBackgroundDetector::new(500.0).detect(&context(tiny.clone())).result);
        assert!(!ProductOnlyHeuristic::default().detect(&context(tiny)).result);
    }
}
