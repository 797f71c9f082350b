use std::path::PathBuf;

use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Training Error: {0}")]
    Training(#[from] TrainingError),
    #[error("Classifier Error: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("Model Store Error: {0}")]
    ModelStore(#[from] ModelStoreError),
    #[error("Image Store Error: {0}")]
    Store(#[from] StoreError),
    #[error("Image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// Training Error Type
#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Cannot train a classifier from an empty dataset")]
    EmptyDataset,
    #[error("Test ratio must be in [0, 1), got {0}")]
    InvalidTestRatio(f64),
    #[error("Sample {index} has {actual} features, expected {expected}")]
    InconsistentFeatureLength {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("No sample left for training after holding out {test_ratio} for evaluation")]
    EmptyTrainingSet { test_ratio: f64 },
    #[error("Training directory does not exist: {0}")]
    MissingTrainingDir(PathBuf),
    #[error("Failed to access training data: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to persist trained model: {0}")]
    Persist(#[from] ModelStoreError),
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("{classifier} model expects {expected} features, got {actual}")]
    FeatureLengthMismatch {
        classifier: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Error, Debug)]
pub enum ModelStoreError {
    #[error("Failed to access model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed model artifact {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No image stored under key {0}")]
    NotFound(String),
    #[error("Failed to read image {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}
