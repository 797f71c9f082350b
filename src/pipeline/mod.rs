pub mod services;
pub mod types;

pub use services::{AnalysisOrchestrator, ColorMatcher, KnnTrainer};
pub use types::{AnalysisResult, ClassifierKind, FeatureSet, FeatureVector, Position};
