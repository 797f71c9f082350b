use serde::{Deserialize, Serialize};

use crate::pipeline::types::Position;

/// Combined per-image analysis. `Default` is the result reported when any
/// part of the analysis fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub position: Option<Position>,
    pub neutral_background: bool,
    pub product_only: bool,
    pub dominant_color: Option<String>,
}
