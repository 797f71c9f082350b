use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::knn::KNearestNeighbors;
use crate::error::ModelStoreError;
use crate::pipeline::types::{ClassifierKind, FeatureSet};

/// Persisted classifier: the fitted estimator plus what is needed to query it
/// consistently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub algorithm: String,
    pub kind: ClassifierKind,
    pub feature_set: FeatureSet,
    pub feature_len: usize,
    pub classes: Vec<String>,
    pub accuracy: f64,
    pub train_count: usize,
    pub test_count: usize,
    pub trained_at: DateTime<Utc>,
    pub estimator: KNearestNeighbors,
}

impl TrainedModel {
    pub const ALGORITHM: &'static str = "k-nearest-neighbors";
}

/// One JSON artifact per classifier kind inside a models directory.
#[derive(Debug, Clone)]
pub struct ModelRepository {
    dir: PathBuf,
}

impl ModelRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, kind: ClassifierKind) -> PathBuf {
        self.dir.join(kind.model_file_name())
    }

    /// Writes the artifact through a sibling temp file so readers never see a
    /// partial model.
    pub fn save(&self, model: &TrainedModel) -> Result<PathBuf, ModelStoreError> {
        let path = self.path_for(model.kind);
        fs::create_dir_all(&self.dir).map_err(|source| ModelStoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let bytes = serde_json::to_vec(model).map_err(|source| ModelStoreError::Serialization {
            path: path.clone(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|source| ModelStoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| ModelStoreError::Io {
            path: path.clone(),
            source,
        })?;

        info!(kind = %model.kind, path = %path.display(), "Saved model");
        Ok(path)
    }

    /// `Ok(None)` when no artifact exists for `kind`.
    pub fn load(&self, kind: ClassifierKind) -> Result<Option<TrainedModel>, ModelStoreError> {
        let path = self.path_for(kind);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(kind = %kind, path = %path.display(), "No model artifact");
                return Ok(None);
            }
            Err(source) => return Err(ModelStoreError::Io { path, source }),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| ModelStoreError::Serialization { path, source })
    }
}
