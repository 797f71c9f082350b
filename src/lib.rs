pub mod config;
pub mod error;
pub mod pipeline;

pub use config::Configuration;
pub use error::{AppError, ClassifierError, ConfigError, ModelStoreError, StoreError, TrainingError};
pub use pipeline::{AnalysisOrchestrator, AnalysisResult, ClassifierKind, Position};
