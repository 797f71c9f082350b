use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::Level;

use crate::error::ConfigError;
use crate::pipeline::services::image::analysis::AnalysisConfig;

const CONFIG_FILE: &str = "product-vision";
const ENV_PREFIX: &str = "PRODUCT_VISION";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Directory holding one `<kind>-classifier.json` artifact per classifier.
    pub models_dir: PathBuf,
    /// Root of the `position/`, `background/` and `product-only/` trees.
    pub training_dir: PathBuf,
    /// Root directory the local image store resolves keys against.
    pub image_root: PathBuf,
    pub log_level: String,
    /// Blocking workers used to extract features while training.
    pub extraction_workers: usize,
    pub analysis: AnalysisConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("storage/models"),
            training_dir: PathBuf::from("storage/training/images"),
            image_root: PathBuf::from("storage/images"),
            log_level: "info".to_string(),
            extraction_workers: 4,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Configuration {
    /// Layers `product-vision.toml` (optional) and `PRODUCT_VISION__*`
    /// environment variables over the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(file: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let configuration: Configuration = settings.try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extraction_workers == 0 {
            return Err(ConfigError::Invalid(
                "extraction_workers must be greater than 0".to_string(),
            ));
        }
        self.log_level()?;
        self.analysis.validate().map_err(ConfigError::Invalid)
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .parse::<Level>()
            .map_err(|_| ConfigError::Invalid(format!("Unknown log level: {}", self.log_level)))
    }
}
