//! Feature vectors fed to the nearest-neighbor classifiers.
//!
//! Vector layouts are part of every persisted model: a model trained on one
//! layout can only be queried with vectors of that same layout.
use image::{imageops, imageops::FilterType, RgbImage};

use super::core::sample_border;
use super::variance::ChannelStats;
use crate::pipeline::types::{FeatureSet, FeatureVector};

#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    filter: FilterType,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }

    pub fn extract(&self, rgb: &RgbImage, feature_set: FeatureSet) -> FeatureVector {
        match feature_set.grid_params() {
            None => self.extract_edge_features(rgb),
            Some((target_size, stride)) => self.extract_grid_features(rgb, target_size, stride),
        }
    }

    /// Border statistics: mean, variance and minimum of R, G and B over the
    /// four image edges. Nine zeros when no border pixel could be read.
    pub fn extract_edge_features(&self, rgb: &RgbImage) -> FeatureVector {
        let (step_x, step_y) = edge_sampling_steps(rgb.width(), rgb.height());
        let pixels = sample_border(rgb, step_x, step_y);

        match ChannelStats::from_pixels(&pixels) {
            Some(stats) => FeatureVector::new(stats.to_features()),
            None => FeatureVector::zeros(FeatureSet::EDGE_STATS_LEN),
        }
    }

    /// Forces the image to `target_size` square, then appends R, G, B for
    /// every `stride`-th pixel in row-major order.
    pub fn extract_grid_features(&self, rgb: &RgbImage, target_size: u32, stride: u32) -> FeatureVector {
        let stride = stride.max(1) as usize;
        let per_axis = target_size.div_ceil(stride as u32) as usize;
        let mut features = Vec::with_capacity(3 * per_axis * per_axis);

        // an empty source cannot be resampled; every read then falls back to zeros
        let resized = if rgb.width() == 0 || rgb.height() == 0 {
            RgbImage::new(0, 0)
        } else {
            imageops::resize(rgb, target_size, target_size, self.filter)
        };

        for y in (0..target_size).step_by(stride) {
            for x in (0..target_size).step_by(stride) {
                match resized.get_pixel_checked(x, y) {
                    Some(pixel) => features.extend(pixel.0.iter().map(|c| *c as f32)),
                    None => features.extend([0.0, 0.0, 0.0]),
                }
            }
        }

        FeatureVector::new(features)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Border sampling strides: between 10 and 50 samples per edge, scaled by
/// width, with the stride floored at 1.
pub fn edge_sampling_steps(width: u32, height: u32) -> (u32, u32) {
    let sample_size = (width / 20).clamp(10, 50);
    ((width / sample_size).max(1), (height / sample_size).max(1))
}
