/// Per-image analysis: learned classifiers where a model exists, direct
/// detectors for everything else.
use super::{
    config::AnalysisConfig,
    core::{AnalysisContext, ImageDetector},
    dominant_color::DominantColorExtractor,
    features::FeatureExtractor,
    heuristics::{NeutralBackgroundDetector, ProductOnlyHeuristic},
};
use crate::{
    config::Configuration,
    error::{AppError, ConfigError},
    pipeline::services::learning::{ImageClassifier, ModelRepository, Prediction},
    pipeline::types::{AnalysisResult, ClassifierKind, Position},
};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};
use tower::Service;
use tracing::{debug, error, warn};

/// Raw encoded image handed to the orchestrator service.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image_bytes: Vec<u8>,
}

impl AnalysisRequest {
    pub fn new(image_bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            image_bytes: image_bytes.into(),
        }
    }
}

/// Cheap to clone; clones share the memoized models.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    position: Arc<ImageClassifier>,
    product_only: Arc<ImageClassifier>,
    extractor: FeatureExtractor,
    neutral_background: NeutralBackgroundDetector,
    product_only_heuristic: ProductOnlyHeuristic,
    dominant_color: DominantColorExtractor,
}

impl AnalysisOrchestrator {
    pub fn new(config: AnalysisConfig, repository: &ModelRepository) -> Result<Self, AppError> {
        Self::with_classifiers(
            config,
            ImageClassifier::new(ClassifierKind::Position, repository.clone()),
            ImageClassifier::new(ClassifierKind::ProductOnly, repository.clone()),
        )
    }

    pub fn from_configuration(configuration: &Configuration) -> Result<Self, AppError> {
        Self::new(
            configuration.analysis.clone(),
            &ModelRepository::new(&configuration.models_dir),
        )
    }

    pub fn with_classifiers(
        config: AnalysisConfig,
        position: ImageClassifier,
        product_only: ImageClassifier,
    ) -> Result<Self, AppError> {
        config
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("Invalid analysis config: {e}")))?;

        Ok(Self {
            position: Arc::new(position),
            product_only: Arc::new(product_only),
            extractor: FeatureExtractor::default(),
            neutral_background: NeutralBackgroundDetector::from_config(&config),
            product_only_heuristic: ProductOnlyHeuristic::from_config(&config),
            dominant_color: DominantColorExtractor::new(config.dominant_color.clone()),
        })
    }

    /// Never fails: any error along the way yields the default result.
    pub fn analyze(&self, image_bytes: &[u8]) -> AnalysisResult {
        match self.try_analyze(image_bytes) {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, bytes = image_bytes.len(), "Image analysis failed");
                AnalysisResult::default()
            }
        }
    }

    pub fn try_analyze(&self, image_bytes: &[u8]) -> Result<AnalysisResult, AppError> {
        let context = AnalysisContext::decode(image_bytes)?;
        self.analyze_image(&context)
    }

    pub fn analyze_image(&self, context: &AnalysisContext) -> Result<AnalysisResult, AppError> {
        let analysis_start = Instant::now();

        let position = self.detect_position(context)?;

        let neutral = self.neutral_background.detect(context);
        debug!(
            "{} in {}us: {}",
            self.neutral_background.name(),
            neutral.processing_time_us,
            neutral.reasoning
        );

        let product_only = self.detect_product_only(context)?;

        let dominant = self.dominant_color.detect(context);
        debug!(
            "{} in {}us: {}",
            self.dominant_color.name(),
            dominant.processing_time_us,
            dominant.reasoning
        );

        let result = AnalysisResult {
            position,
            neutral_background: neutral.result,
            product_only,
            dominant_color: dominant.result,
        };
        debug!(
            elapsed_us = analysis_start.elapsed().as_micros() as u64,
            result = ?result,
            "Analyzed image"
        );
        Ok(result)
    }

    fn detect_position(&self, context: &AnalysisContext) -> Result<Option<Position>, AppError> {
        if !self.position.is_available() {
            return Ok(None);
        }

        let features = self.extractor.extract(&context.rgb, self.position.feature_set());
        match self.position.predict(&features)? {
            Prediction::Label(label) => {
                let position = Position::from_label(&label);
                if position.is_none() {
                    warn!(label = %label, "Position model produced an unknown label");
                }
                Ok(position)
            }
            Prediction::ModelAbsent => Ok(None),
        }
    }

    fn detect_product_only(&self, context: &AnalysisContext) -> Result<bool, AppError> {
        if self.product_only.is_available() {
            let features = self.extractor.extract(&context.rgb, self.product_only.feature_set());
            if let Prediction::Label(label) = self.product_only.predict(&features)? {
                return Ok(label == "true");
            }
        }

        let heuristic = self.product_only_heuristic.detect(context);
        debug!(
            "{} in {}us: {}",
            self.product_only_heuristic.name(),
            heuristic.processing_time_us,
            heuristic.reasoning
        );
        Ok(heuristic.result)
    }
}

impl Service<AnalysisRequest> for AnalysisOrchestrator {
    type Response = AnalysisResult;
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: AnalysisRequest) -> Self::Future {
        let orchestrator = self.clone();
        Box::pin(async move {
            // decoding and resampling are CPU bound
            match tokio::task::spawn_blocking(move || orchestrator.analyze(&request.image_bytes)).await {
                Ok(result) => Ok(result),
                Err(e) => {
                    error!(error = %e, "Analysis task failed");
                    Ok(AnalysisResult::default())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::services::learning::{KNearestNeighbors, TrainedModel};
    use crate::pipeline::types::{FeatureSet, LabeledSample};
    use chrono::Utc;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tower::ServiceExt;

    fn png(rgb: RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn red_on_white() -> RgbImage {
        ImageBuffer::from_fn(300, 300, |x, y| {
            if (100..200).contains(&x) && (100..200).contains(&y) {
                Rgb([255, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    fn model(kind: ClassifierKind, samples: Vec<LabeledSample>) -> TrainedModel {
        let feature_len = samples[0].features.len();
        let mut estimator = KNearestNeighbors::default();
        estimator.fit(samples);
        TrainedModel {
            algorithm: TrainedModel::ALGORITHM.to_string(),
            kind,
            feature_set: kind.feature_set(),
            feature_len,
            classes: Vec::new(),
            accuracy: 1.0,
            train_count: 1,
            test_count: 0,
            trained_at: Utc::now(),
            estimator,
        }
    }

    fn without_models(dir: &std::path::Path) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(AnalysisConfig::default(), &ModelRepository::new(dir)).unwrap()
    }

    #[test]
    fn undecodable_bytes_give_default_result() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = without_models(dir.path());
        assert_eq!(orchestrator.analyze(b"definitely not an image"), AnalysisResult::default());
        assert!(matches!(
            orchestrator.try_analyze(b""),
            Err(AppError::Decode(_))
        ));
    }

    #[test]
    fn without_models_falls_back_to_direct_detectors() {
        let dir = tempfile::tempdir().unwrap();
        let result = without_models(dir.path()).analyze(&png(red_on_white()));

        assert_eq!(result.position, None);
        assert!(result.neutral_background);
        assert_eq!(result.dominant_color.as_deref(), Some("#ff0000"));
    }

    #[test]
    fn position_model_labels_are_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let repository = ModelRepository::new(dir.path());
        let rgb = red_on_white();
        let features = FeatureExtractor::default().extract(&rgb, FeatureSet::CoarseGrid);
        let position = ImageClassifier::with_model(
            model(ClassifierKind::Position, vec![LabeledSample::new(features, "Lateral Left")]),
            repository.clone(),
        );
        let product_only = ImageClassifier::new(ClassifierKind::ProductOnly, repository);

        let orchestrator =
            AnalysisOrchestrator::with_classifiers(AnalysisConfig::default(), position, product_only).unwrap();
        assert_eq!(orchestrator.analyze(&png(rgb)).position, Some(Position::Side));
    }

    #[test]
    fn product_only_model_overrides_heuristic() {
        let dir = tempfile::tempdir().unwrap();
        let repository = ModelRepository::new(dir.path());
        let rgb = red_on_white();
        let features = FeatureExtractor::default().extract(&rgb, FeatureSet::FineGrid);
        let product_only = ImageClassifier::with_model(
            model(ClassifierKind::ProductOnly, vec![LabeledSample::new(features, "true")]),
            repository.clone(),
        );
        let position = ImageClassifier::new(ClassifierKind::Position, repository);

        let orchestrator =
            AnalysisOrchestrator::with_classifiers(AnalysisConfig::default(), position, product_only).unwrap();
        assert!(orchestrator.analyze(&png(rgb)).product_only);
    }

    #[test]
    fn feature_mismatch_degrades_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let repository = ModelRepository::new(dir.path());
        let product_only = ImageClassifier::with_model(
            model(ClassifierKind::ProductOnly, vec![LabeledSample::new(vec![0.0; 3], "true")]),
            repository.clone(),
        );
        let position = ImageClassifier::new(ClassifierKind::Position, repository);

        let orchestrator =
            AnalysisOrchestrator::with_classifiers(AnalysisConfig::default(), position, product_only).unwrap();
        assert_eq!(orchestrator.analyze(&png(red_on_white())), AnalysisResult::default());
    }

    #[test]
    fn rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AnalysisConfig::default();
        config.dominant_color.quantization_step = 0;
        assert!(matches!(
            AnalysisOrchestrator::new(config, &ModelRepository::new(dir.path())),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn serves_requests_through_tower() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = without_models(dir.path());
        let result = orchestrator
            .oneshot(AnalysisRequest::new(png(red_on_white())))
            .await
            .unwrap();
        assert_eq!(result.dominant_color.as_deref(), Some("#ff0000"));
    }
}
