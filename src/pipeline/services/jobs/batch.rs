use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::analyze_image_job::{AnalyzeImageJob, ImageMetadata, ImageStatus, JobRunner};
use super::store::LocalImageStore;
use crate::error::AppError;

const METADATA_SUFFIX: &str = ".ml.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
    /// Images whose metadata already reads `MlCompleted`.
    pub skipped: usize,
}

/// Metadata of `key` lives next to the image as `<key>.ml.json`.
fn metadata_path(store: &LocalImageStore, key: &str) -> PathBuf {
    let mut name = OsString::from(store.root().join(key));
    name.push(METADATA_SUFFIX);
    PathBuf::from(name)
}

async fn load_metadata(path: &Path) -> Result<Option<ImageMetadata>, AppError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn process_one(
    runner: &JobRunner<LocalImageStore>,
    key: &str,
    path: &Path,
    metadata: &mut ImageMetadata,
) -> Result<(), AppError> {
    let job = AnalyzeImageJob {
        image_id: metadata.id,
        storage_key: key.to_string(),
        product_id: None,
        product_sku: None,
    };
    runner.run(&job, metadata).await?;
    tokio::fs::write(path, serde_json::to_vec_pretty(metadata)?).await?;
    Ok(())
}

/// Runs the analysis job for every image under the store root still waiting
/// for classification, at most `limit` of them. A failing image is logged and
/// counted, the batch goes on.
pub async fn process_waiting_images(
    runner: &JobRunner<LocalImageStore>,
    limit: Option<usize>,
) -> Result<BatchReport, AppError> {
    let store = runner.store();
    let keys = store.list_keys().await?;
    let mut report = BatchReport::default();

    let mut waiting = Vec::new();
    for key in keys {
        let path = metadata_path(store, &key);
        let metadata = match load_metadata(&path).await {
            Ok(Some(metadata)) if metadata.status == ImageStatus::MlCompleted => {
                report.skipped += 1;
                continue;
            }
            Ok(Some(metadata)) => metadata,
            Ok(None) => ImageMetadata::new(Uuid::new_v4()),
            Err(e) => {
                warn!(key = %key, error = %e, "Unreadable image metadata, starting over");
                ImageMetadata::new(Uuid::new_v4())
            }
        };
        waiting.push((key, path, metadata));
    }

    let total = waiting.len();
    let batch = waiting.into_iter().take(limit.unwrap_or(usize::MAX));
    for (key, path, mut metadata) in batch {
        match process_one(runner, &key, &path, &mut metadata).await {
            Ok(()) => report.processed += 1,
            Err(e) => {
                error!(key = %key, error = %e, "Image analysis failed");
                report.failed += 1;
            }
        }
    }

    info!(
        waiting = total,
        processed = report.processed,
        failed = report.failed,
        skipped = report.skipped,
        "Processed waiting images"
    );
    Ok(report)
}
