pub mod balancer;
pub mod classifier;
pub mod dataset;
pub mod knn;
pub mod layout;
pub mod model;
pub mod trainer;

pub use balancer::DatasetBalancer;
pub use classifier::{ImageClassifier, ModelState, Prediction};
pub use dataset::Dataset;
pub use knn::KNearestNeighbors;
pub use layout::{ReorganizeReport, TrainingLayout};
pub use model::{ModelRepository, TrainedModel};
pub use trainer::{KnnTrainer, TrainingOptions, TrainingOutcome};
