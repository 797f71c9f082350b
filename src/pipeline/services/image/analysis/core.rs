use image::{imageops, imageops::FilterType, DynamicImage, ImageError, RgbImage};
use std::sync::Arc;
use std::time::Instant;

pub type Rgb8 = [u8; 3];

/// Decoded image shared by every detector of one analysis.
#[derive(Clone)]
pub struct AnalysisContext {
    pub rgb: Arc<RgbImage>,
    pub dimensions: (u32, u32),
}

impl AnalysisContext {
    pub fn new(image: DynamicImage) -> Self {
        let rgb = Arc::new(image.to_rgb8());
        let dimensions = rgb.dimensions();

        Self { rgb, dimensions }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        Ok(Self::new(image::load_from_memory(bytes)?))
    }
}

/// Result of a detection operation with its reasoning, for debug logging.
#[derive(Debug, Clone)]
pub struct DetectionResult<T> {
    pub result: T,
    pub reasoning: String,
    pub processing_time_us: u64,
}

impl<T> DetectionResult<T> {
    pub fn new(result: T, reasoning: String) -> Self {
        Self {
            result,
            reasoning,
            processing_time_us: 0,
        }
    }

    pub fn with_timing(mut self, start_time: Instant) -> Self {
        self.processing_time_us = start_time.elapsed().as_micros() as u64;
        self
    }
}

/// Direct (non-learned) detector over a decoded image.
pub trait ImageDetector: Send + Sync {
    type Output;

    fn detect(&self, context: &AnalysisContext) -> DetectionResult<Self::Output>;
    fn name(&self) -> &'static str;
}

/// Rectangular region of an image for focused analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ImageRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region left after removing a margin of `margin_fraction * width`
    /// pixels on every side. Both axes use the width-derived margin.
    pub fn inset(width: u32, height: u32, margin_fraction: f64) -> Self {
        let margin = (width as f64 * margin_fraction) as u32;
        Self::new(
            margin,
            margin,
            width.saturating_sub(2 * margin),
            height.saturating_sub(2 * margin),
        )
    }

    /// Centered region spanning `fraction` of the width and of the height.
    pub fn centered(width: u32, height: u32, fraction: f64) -> Self {
        let region_width = (width as f64 * fraction) as u32;
        let region_height = (height as f64 * fraction) as u32;
        Self::new(
            (width - region_width.min(width)) / 2,
            (height - region_height.min(height)) / 2,
            region_width,
            region_height,
        )
    }

    pub fn contains_point(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Upper bound on the height produced by [`scale_to_width`].
pub const MAX_SCALED_HEIGHT: u32 = 4096;

/// Proportional resize to `width`. Returns a copy when the width already
/// matches. Very tall images are squeezed to [`MAX_SCALED_HEIGHT`] rows.
pub fn scale_to_width(rgb: &RgbImage, width: u32) -> RgbImage {
    let (current_width, current_height) = rgb.dimensions();
    if current_width == width || current_width == 0 {
        return rgb.clone();
    }
    let height = (current_height as f64 * width as f64 / current_width as f64)
        .round()
        .clamp(1.0, MAX_SCALED_HEIGHT as f64) as u32;
    imageops::resize(rgb, width, height, FilterType::Triangle)
}

/// Samples the top and bottom rows every `step_x` pixels, then the left and
/// right columns every `step_y` pixels. Unreadable pixels are skipped.
pub fn sample_border(rgb: &RgbImage, step_x: u32, step_y: u32) -> Vec<Rgb8> {
    let (width, height) = rgb.dimensions();
    let mut pixels = Vec::new();
    if width == 0 || height == 0 {
        return pixels;
    }
    let step_x = step_x.max(1) as usize;
    let step_y = step_y.max(1) as usize;

    for row in [0, height - 1] {
        for x in (0..width).step_by(step_x) {
            if let Some(pixel) = rgb.get_pixel_checked(x, row) {
                pixels.push(pixel.0);
            }
        }
    }
    for column in [0, width - 1] {
        for y in (0..height).step_by(step_y) {
            if let Some(pixel) = rgb.get_pixel_checked(column, y) {
                pixels.push(pixel.0);
            }
        }
    }

    pixels
}

/// Samples `region` on a `step` grid. Unreadable pixels are skipped.
pub fn sample_region(rgb: &RgbImage, region: ImageRegion, step: u32) -> Vec<Rgb8> {
    let step = step.max(1) as usize;
    let mut pixels = Vec::new();

    for y in (region.y..region.y + region.height).step_by(step) {
        for x in (region.x..region.x + region.width).step_by(step) {
            if let Some(pixel) = rgb.get_pixel_checked(x, y) {
                pixels.push(pixel.0);
            }
        }
    }

    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn border_sampling_visits_all_four_edges() {
        let rgb = RgbImage::from_pixel(4, 3, Rgb([7, 7, 7]));
        // 4 + 4 columns on the rows, 3 + 3 rows on the columns
        assert_eq!(sample_border(&rgb, 1, 1).len(), 14);
        assert!(sample_border(&RgbImage::new(0, 0), 1, 1).is_empty());
    }

    #[test]
    fn centered_region_is_centered() {
        let region = ImageRegion::centered(100, 50, 0.3);
        assert_eq!(region, ImageRegion::new(35, 17, 30, 15));
        assert!(region.contains_point(50, 25));
    }

    #[test]
    fn inset_margin_comes_from_width_on_both_axes() {
        assert_eq!(ImageRegion::inset(200, 100, 0.2), ImageRegion::new(40, 40, 120, 20));
        assert_eq!(ImageRegion::inset(200, 400, 0.2), ImageRegion::new(40, 40, 120, 320));
        assert!(ImageRegion::inset(200, 60, 0.2).is_empty());
    }

    #[test]
    fn scale_to_width_preserves_aspect_ratio() {
        let rgb = RgbImage::from_pixel(300, 200, Rgb([1, 2, 3]));
        let scaled = scale_to_width(&rgb, 150);
        assert_eq!(scaled.dimensions(), (150, 100));
        assert_eq!(scale_to_width(&scaled, 150).dimensions(), (150, 100));
    }

    #[test]
    fn extreme_aspect_ratio_height_is_capped() {
        let sliver = RgbImage::from_pixel(1, 100_000, Rgb([9, 9, 9]));
        assert_eq!(scale_to_width(&sliver, 150).dimensions(), (150, MAX_SCALED_HEIGHT));
    }
}
