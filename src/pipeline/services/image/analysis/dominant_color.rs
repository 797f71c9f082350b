use indexmap::IndexMap;
use image::RgbImage;
use std::time::Instant;

use super::config::DominantColorConfig;
use super::core::{scale_to_width, AnalysisContext, DetectionResult, ImageDetector, ImageRegion};
use crate::pipeline::services::color::rgb_to_hex;

#[derive(Debug, Default, Clone, Copy)]
struct ColorBucket {
    count: u64,
    sums: [u64; 3],
}

/// Garment color estimate: the most populated quantized color in the center
/// of the photo, reported as the mean of its unquantized members.
#[derive(Debug, Clone)]
pub struct DominantColorExtractor {
    config: DominantColorConfig,
}

impl DominantColorExtractor {
    pub fn new(config: DominantColorConfig) -> Self {
        Self { config }
    }

    fn quantize(&self, value: u8) -> u8 {
        let step = self.config.quantization_step;
        (value / step) * step
    }

    /// Lowercase `#rrggbb`, or `None` when every sampled pixel was filtered out.
    pub fn extract(&self, rgb: &RgbImage) -> Option<String> {
        let resized = scale_to_width(rgb, self.config.scale_width);
        let (width, height) = resized.dimensions();

        let region = ImageRegion::centered(width, height, self.config.region_fraction);
        if region.is_empty() {
            return None;
        }

        let step = self.config.sample_step.max(1) as usize;
        let mut buckets: IndexMap<(u8, u8, u8), ColorBucket> = IndexMap::new();

        for y in (region.y..region.y + region.height).step_by(step) {
            for x in (region.x..region.x + region.width).step_by(step) {
                let Some(pixel) = resized.get_pixel_checked(x, y) else {
                    continue;
                };
                let [r, g, b] = pixel.0;
                let luminance = (r as f64 + g as f64 + b as f64) / 3.0;
                if luminance < self.config.min_luminance || luminance > self.config.max_luminance {
                    continue;
                }

                let key = (self.quantize(r), self.quantize(g), self.quantize(b));
                let bucket = buckets.entry(key).or_default();
                bucket.count += 1;
                bucket.sums[0] += r as u64;
                bucket.sums[1] += g as u64;
                bucket.sums[2] += b as u64;
            }
        }

        // strict comparison keeps the first bucket reached on ties
        let mut dominant: Option<ColorBucket> = None;
        for bucket in buckets.values() {
            if dominant.map_or(true, |best| bucket.count > best.count) {
                dominant = Some(*bucket);
            }
        }

        dominant.map(|bucket| {
            let mean = bucket.sums.map(|sum| (sum / bucket.count) as u8);
            rgb_to_hex(mean)
        })
    }
}

impl Default for DominantColorExtractor {
    fn default() -> Self {
        Self::new(DominantColorConfig::default())
    }
}

impl ImageDetector for DominantColorExtractor {
    type Output = Option<String>;

    fn detect(&self, context: &AnalysisContext) -> DetectionResult<Option<String>> {
        let start_time = Instant::now();
        let color = self.extract(&context.rgb);
        let reasoning = match &color {
            Some(hex) => format!("dominant center color {hex}"),
            None => "no usable center pixels".to_string(),
        };
        DetectionResult::new(color, reasoning).with_timing(start_time)
    }

    fn name(&self) -> &'static str {
        "DominantColorExtractor"
    }
}
