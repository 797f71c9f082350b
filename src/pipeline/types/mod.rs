mod analysis_result;
mod classifier_kind;
mod feature_vector;
mod position;

pub use analysis_result::AnalysisResult;
pub use classifier_kind::ClassifierKind;
pub use feature_vector::{FeatureSet, FeatureVector, LabeledSample};
pub use position::Position;
