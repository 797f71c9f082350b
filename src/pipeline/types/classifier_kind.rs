use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::types::FeatureSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierKind {
    Position,
    Background,
    ProductOnly,
}

impl ClassifierKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::Position => "position",
            ClassifierKind::Background => "background",
            ClassifierKind::ProductOnly => "product-only",
        }
    }

    pub fn model_file_name(&self) -> String {
        format!("{}-classifier.json", self.name())
    }

    pub fn feature_set(&self) -> FeatureSet {
        match self {
            ClassifierKind::Position => FeatureSet::CoarseGrid,
            ClassifierKind::Background => FeatureSet::EdgeStats,
            ClassifierKind::ProductOnly => FeatureSet::FineGrid,
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
