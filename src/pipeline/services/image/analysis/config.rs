use serde::Deserialize;

/// Tunable parameters for per-image analysis. The defaults are empirical
/// values tuned on catalog photography and must stay as they are for results
/// to match previously labeled images.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Border color variance under which a background counts as neutral.
    pub neutral_background_max_variance: f64,
    /// Center variance above which the heuristic sees a detailed product.
    pub product_only_min_center_variance: f64,
    /// Border variance under which the heuristic sees a plain backdrop.
    pub product_only_max_edge_variance: f64,
    pub heuristic_sampling: HeuristicSamplingConfig,
    pub dominant_color: DominantColorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeuristicSamplingConfig {
    pub scale_width: u32,
    pub sample_step: u32,
    /// Fraction of the scaled width excluded on every side of the center
    /// region, vertical margin included.
    pub margin_fraction: f64,
    /// Images smaller than this on either axis are never classified.
    pub min_dimension: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DominantColorConfig {
    pub scale_width: u32,
    /// Width and height fraction of the central sampled region.
    pub region_fraction: f64,
    pub sample_step: u32,
    pub min_luminance: f64,
    pub max_luminance: f64,
    pub quantization_step: u8,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            neutral_background_max_variance: 500.0,
            product_only_min_center_variance: 1000.0,
            product_only_max_edge_variance: 800.0,
            heuristic_sampling: HeuristicSamplingConfig::default(),
            dominant_color: DominantColorConfig::default(),
        }
    }
}

impl Default for HeuristicSamplingConfig {
    fn default() -> Self {
        Self {
            scale_width: 200,
            sample_step: 10,
            margin_fraction: 0.2,
            min_dimension: 10,
        }
    }
}

impl Default for DominantColorConfig {
    fn default() -> Self {
        Self {
            scale_width: 150,
            region_fraction: 0.3,
            sample_step: 2,
            min_luminance: 10.0, // near-black artifacts
            max_luminance: 245.0, // near-white backdrop
            quantization_step: 16,
        }
    }
}

impl AnalysisConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.neutral_background_max_variance < 0.0
            || self.product_only_min_center_variance < 0.0
            || self.product_only_max_edge_variance < 0.0
        {
            return Err("Variance thresholds must be non-negative".to_string());
        }

        let sampling = &self.heuristic_sampling;
        if sampling.scale_width == 0 || sampling.sample_step == 0 {
            return Err("Heuristic scale width and sample step must be greater than 0".to_string());
        }
        if !(0.0..0.5).contains(&sampling.margin_fraction) {
            return Err("Heuristic margin fraction must be in [0, 0.5)".to_string());
        }

        let dominant = &self.dominant_color;
        if dominant.scale_width == 0 || dominant.sample_step == 0 {
            return Err("Dominant color scale width and sample step must be greater than 0".to_string());
        }
        if dominant.region_fraction <= 0.0 || dominant.region_fraction > 1.0 {
            return Err("Dominant color region fraction must be in (0, 1]".to_string());
        }
        if dominant.min_luminance > dominant.max_luminance {
            return Err("Dominant color luminance bounds are inverted".to_string());
        }
        if dominant.quantization_step == 0 {
            return Err("Quantization step must be greater than 0".to_string());
        }

        Ok(())
    }
}
