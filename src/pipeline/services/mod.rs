pub mod color;
pub mod image;
pub mod jobs;
pub mod learning;

pub use color::{find_closest_primary_color, ColorMatcher, PrimaryColor, PrimaryColorCatalog};
pub use image::{AnalysisConfig, AnalysisOrchestrator, AnalysisRequest};
pub use jobs::{AnalyzeImageJob, ImageStore, JobRunner, LocalImageStore};
pub use learning::{DatasetBalancer, ImageClassifier, KnnTrainer, ModelRepository, TrainingLayout};
