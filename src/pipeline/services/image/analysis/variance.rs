use super::core::Rgb8;

/// Population variance (divides by n). Empty input has zero variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Mean of the per-channel population variances of `pixels`.
pub fn color_variance(pixels: &[Rgb8]) -> f64 {
    if pixels.is_empty() {
        return 0.0;
    }
    let channels = split_channels(pixels);
    channels.iter().map(|c| variance(c)).sum::<f64>() / 3.0
}

fn split_channels(pixels: &[Rgb8]) -> [Vec<f64>; 3] {
    let mut channels = [
        Vec::with_capacity(pixels.len()),
        Vec::with_capacity(pixels.len()),
        Vec::with_capacity(pixels.len()),
    ];
    for pixel in pixels {
        for (channel, value) in channels.iter_mut().zip(pixel.iter()) {
            channel.push(*value as f64);
        }
    }
    channels
}

/// Per-channel mean, variance and minimum over a pixel sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: [f64; 3],
    pub variance: [f64; 3],
    pub min: [f64; 3],
}

impl ChannelStats {
    pub fn from_pixels(pixels: &[Rgb8]) -> Option<Self> {
        if pixels.is_empty() {
            return None;
        }
        let channels = split_channels(pixels);
        let n = pixels.len() as f64;
        let mut stats = ChannelStats {
            mean: [0.0; 3],
            variance: [0.0; 3],
            min: [0.0; 3],
        };
        for (i, channel) in channels.iter().enumerate() {
            stats.mean[i] = channel.iter().sum::<f64>() / n;
            stats.variance[i] = variance(channel);
            stats.min[i] = channel.iter().cloned().fold(f64::INFINITY, f64::min);
        }
        Some(stats)
    }

    /// `[mean_R, mean_G, mean_B, var_R, var_G, var_B, min_R, min_G, min_B]`
    pub fn to_features(&self) -> Vec<f32> {
        self.mean
            .iter()
            .chain(self.variance.iter())
            .chain(self.min.iter())
            .map(|v| *v as f32)
            .collect()
    }
}
