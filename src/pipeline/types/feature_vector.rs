use serde::{Deserialize, Serialize};

/// Fixed-length numeric summary of an image used as KNN input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Squared Euclidean distance. Both vectors must share a length.
    pub fn squared_distance(&self, other: &FeatureVector) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| {
                let d = (*a - *b) as f64;
                d * d
            })
            .sum()
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Extraction mode a model was trained with. Inference against a model must
/// reuse the same mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureSet {
    /// Border mean / variance / min per channel.
    EdgeStats,
    /// 112x112 grid sampled every 2px.
    CoarseGrid,
    /// 224x224 grid sampled every pixel.
    FineGrid,
}

impl FeatureSet {
    pub const EDGE_STATS_LEN: usize = 9;

    /// `(target_size, stride)` for grid modes.
    pub fn grid_params(&self) -> Option<(u32, u32)> {
        match self {
            FeatureSet::EdgeStats => None,
            FeatureSet::CoarseGrid => Some((112, 2)),
            FeatureSet::FineGrid => Some((224, 1)),
        }
    }

    pub fn expected_len(&self) -> usize {
        match self.grid_params() {
            None => Self::EDGE_STATS_LEN,
            Some((size, stride)) => {
                let per_axis = size.div_ceil(stride.max(1)) as usize;
                3 * per_axis * per_axis
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub features: FeatureVector,
    pub label: String,
}

impl LabeledSample {
    pub fn new(features: impl Into<FeatureVector>, label: impl Into<String>) -> Self {
        Self {
            features: features.into(),
            label: label.into(),
        }
    }
}
