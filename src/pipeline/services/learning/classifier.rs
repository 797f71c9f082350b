use std::sync::{Arc, OnceLock};

use tracing::{error, info, warn};

use super::model::{ModelRepository, TrainedModel};
use crate::error::ClassifierError;
use crate::pipeline::types::{ClassifierKind, FeatureSet, FeatureVector, Position};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    Label(String),
    /// No usable model exists for this classifier.
    ModelAbsent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Unloaded,
    Loaded,
    Absent,
}

/// Inference side of one classifier kind. The artifact is read on first use
/// and the outcome, model or absence, is kept for the life of the process.
#[derive(Debug)]
pub struct ImageClassifier {
    kind: ClassifierKind,
    repository: ModelRepository,
    model: OnceLock<Option<Arc<TrainedModel>>>,
}

impl ImageClassifier {
    pub fn new(kind: ClassifierKind, repository: ModelRepository) -> Self {
        Self {
            kind,
            repository,
            model: OnceLock::new(),
        }
    }

    /// Classifier backed by an already trained model.
    pub fn with_model(model: TrainedModel, repository: ModelRepository) -> Self {
        let classifier = Self::new(model.kind, repository);
        let _ = classifier.model.set(Some(Arc::new(model)));
        classifier
    }

    pub fn kind(&self) -> ClassifierKind {
        self.kind
    }

    /// Feature layout to extract before calling [`predict`](Self::predict).
    pub fn feature_set(&self) -> FeatureSet {
        self.model()
            .map(|m| m.feature_set)
            .unwrap_or_else(|| self.kind.feature_set())
    }

    pub fn state(&self) -> ModelState {
        match self.model.get() {
            None => ModelState::Unloaded,
            Some(Some(_)) => ModelState::Loaded,
            Some(None) => ModelState::Absent,
        }
    }

    pub fn is_available(&self) -> bool {
        self.model().is_some()
    }

    pub fn model(&self) -> Option<&Arc<TrainedModel>> {
        self.model.get_or_init(|| self.load()).as_ref()
    }

    fn load(&self) -> Option<Arc<TrainedModel>> {
        match self.repository.load(self.kind) {
            Ok(Some(model)) => {
                info!(
                    classifier = %self.kind,
                    classes = ?model.classes,
                    accuracy = model.accuracy,
                    "Loaded classifier model"
                );
                Some(Arc::new(model))
            }
            Ok(None) => {
                warn!(classifier = %self.kind, path = %self.repository.path_for(self.kind).display(), "No trained model found");
                None
            }
            Err(e) => {
                error!(classifier = %self.kind, error = %e, "Unusable model artifact, treating as absent");
                None
            }
        }
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError> {
        let Some(model) = self.model() else {
            return Ok(Prediction::ModelAbsent);
        };

        if features.len() != model.feature_len {
            return Err(ClassifierError::FeatureLengthMismatch {
                classifier: self.kind.to_string(),
                expected: model.feature_len,
                actual: features.len(),
            });
        }

        Ok(match model.estimator.predict(features) {
            Some(label) => Prediction::Label(self.normalize_label(label)),
            None => Prediction::ModelAbsent,
        })
    }

    fn normalize_label(&self, label: String) -> String {
        if self.kind == ClassifierKind::Position && Position::is_legacy_lateral(&label) {
            return Position::Side.as_str().to_string();
        }
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::services::learning::KNearestNeighbors;
    use crate::pipeline::types::LabeledSample;
    use chrono::Utc;

    fn position_model(labels: &[&str]) -> TrainedModel {
        let mut estimator = KNearestNeighbors::default();
        estimator.fit(
            labels
                .iter()
                .enumerate()
                .map(|(i, label)| LabeledSample::new(vec![i as f32; 3], *label))
                .collect(),
        );
        TrainedModel {
            algorithm: TrainedModel::ALGORITHM.to_string(),
            kind: ClassifierKind::Position,
            feature_set: FeatureSet::CoarseGrid,
            feature_len: 3,
            classes: labels.iter().map(|l| l.to_string()).collect(),
            accuracy: 1.0,
            train_count: labels.len(),
            test_count: 0,
            trained_at: Utc::now(),
            estimator,
        }
    }

    #[test]
    fn missing_artifact_reports_model_absent() {
        let dir = tempfile::tempdir().unwrap();
        let classifier = ImageClassifier::new(ClassifierKind::ProductOnly, ModelRepository::new(dir.path()));
        assert_eq!(classifier.state(), ModelState::Unloaded);
        assert_eq!(
            classifier.predict(&FeatureVector::zeros(3)).unwrap(),
            Prediction::ModelAbsent
        );
        assert_eq!(classifier.state(), ModelState::Absent);
    }

    #[test]
    fn absence_is_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let repository = ModelRepository::new(dir.path());
        let classifier = ImageClassifier::new(ClassifierKind::Position, repository.clone());
        assert!(!classifier.is_available());

        repository.save(&position_model(&["Front"])).unwrap();
        assert!(!classifier.is_available());
        assert!(ImageClassifier::new(ClassifierKind::Position, repository).is_available());
    }

    #[test]
    fn corrupt_artifact_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let repository = ModelRepository::new(dir.path());
        std::fs::write(repository.path_for(ClassifierKind::Position), b"[]").unwrap();
        let classifier = ImageClassifier::new(ClassifierKind::Position, repository);
        assert_eq!(
            classifier.predict(&FeatureVector::zeros(3)).unwrap(),
            Prediction::ModelAbsent
        );
    }

    #[test]
    fn legacy_lateral_label_becomes_side() {
        let dir = tempfile::tempdir().unwrap();
        let classifier = ImageClassifier::with_model(
            position_model(&["Lateral Left"]),
            ModelRepository::new(dir.path()),
        );
        assert_eq!(classifier.state(), ModelState::Loaded);
        assert_eq!(
            classifier.predict(&FeatureVector::zeros(3)).unwrap(),
            Prediction::Label("Side".to_string())
        );
    }

    #[test]
    fn rejects_mismatched_feature_length() {
        let dir = tempfile::tempdir().unwrap();
        let classifier =
            ImageClassifier::with_model(position_model(&["Front"]), ModelRepository::new(dir.path()));
        assert!(matches!(
            classifier.predict(&FeatureVector::zeros(4)),
            Err(ClassifierError::FeatureLengthMismatch { expected: 3, actual: 4, .. })
        ));
    }
}
