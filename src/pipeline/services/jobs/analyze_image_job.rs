use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use tracing::{info, instrument};
use uuid::Uuid;

use super::store::ImageStore;
use crate::error::AppError;
use crate::pipeline::services::color::PrimaryColorCatalog;
use crate::pipeline::services::image::analysis::{AnalysisOrchestrator, AnalysisRequest};
use crate::pipeline::types::{AnalysisResult, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Uploaded,
    MlCompleted,
}

/// Classification fields stored with a product image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub id: Uuid,
    pub position: Option<Position>,
    pub neutral_background: bool,
    pub product_only: bool,
    pub status: ImageStatus,
}

impl ImageMetadata {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            position: None,
            neutral_background: false,
            product_only: false,
            status: ImageStatus::Uploaded,
        }
    }

    /// Folds an analysis into the stored fields without overriding what an
    /// operator already set: position is only filled when empty, the two
    /// flags are only ever raised.
    pub fn merge_analysis(&mut self, analysis: &AnalysisResult) {
        if self.position.is_none() {
            self.position = analysis.position;
        }
        if !self.neutral_background {
            self.neutral_background = analysis.neutral_background;
        }
        if !self.product_only {
            self.product_only = analysis.product_only;
        }
        self.status = ImageStatus::MlCompleted;
    }
}

/// Queue payload for one image analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeImageJob {
    pub image_id: Uuid,
    pub storage_key: String,
    pub product_id: Option<Uuid>,
    pub product_sku: Option<String>,
}

/// Color variant the product should carry for an analyzed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSuggestion {
    pub product_id: Uuid,
    pub primary_color_id: Uuid,
    pub sku: String,
}

#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub analysis: AnalysisResult,
    pub variant: Option<VariantSuggestion>,
}

/// `"TSHIRT-01"` and `"Rouge"` give `"TSHIRT-01-ROU"`.
pub fn variant_sku(product_sku: &str, color_name: &str) -> String {
    let prefix: String = color_name.chars().take(3).collect();
    format!("{}-{}", product_sku, prefix.to_uppercase())
}

pub struct JobRunner<S> {
    store: Arc<S>,
    orchestrator: AnalysisOrchestrator,
    catalog: Arc<PrimaryColorCatalog>,
}

impl<S: ImageStore> JobRunner<S> {
    pub fn new(store: Arc<S>, orchestrator: AnalysisOrchestrator, catalog: Arc<PrimaryColorCatalog>) -> Self {
        Self {
            store,
            orchestrator,
            catalog,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch, analyze and merge. Fetch failures are returned so the queue can
    /// retry; analysis itself never fails.
    #[instrument(skip(self, metadata), fields(image_id = %job.image_id))]
    pub async fn run(&self, job: &AnalyzeImageJob, metadata: &mut ImageMetadata) -> Result<JobOutcome, AppError> {
        let bytes = self.store.fetch(&job.storage_key).await?;
        let analysis = self
            .orchestrator
            .clone()
            .oneshot(AnalysisRequest::new(bytes))
            .await?;

        info!(
            position = ?analysis.position,
            neutral_background = analysis.neutral_background,
            product_only = analysis.product_only,
            dominant_color = ?analysis.dominant_color,
            "Analyzed product image"
        );
        metadata.merge_analysis(&analysis);

        let variant = self.suggest_variant(job, &analysis);
        if let Some(variant) = &variant {
            info!(sku = %variant.sku, "Suggested color variant");
        }

        Ok(JobOutcome { analysis, variant })
    }

    fn suggest_variant(&self, job: &AnalyzeImageJob, analysis: &AnalysisResult) -> Option<VariantSuggestion> {
        let hex = analysis.dominant_color.as_deref()?;
        let product_id = job.product_id?;
        let product_sku = job.product_sku.as_deref()?;
        let color = self.catalog.closest_root(hex)?;

        Some(VariantSuggestion {
            product_id,
            primary_color_id: color.id,
            sku: variant_sku(product_sku, &color.name),
        })
    }
}
