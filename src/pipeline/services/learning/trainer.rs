use std::path::{Path, PathBuf};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use super::balancer::DatasetBalancer;
use super::dataset::Dataset;
use super::knn::KNearestNeighbors;
use super::layout::TrainingLayout;
use super::model::{ModelRepository, TrainedModel};
use crate::error::TrainingError;
use crate::pipeline::services::image::analysis::FeatureExtractor;
use crate::pipeline::types::{ClassifierKind, FeatureSet, FeatureVector, LabeledSample};

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub accuracy: f64,
    pub train_count: usize,
    pub test_count: usize,
    pub model_path: PathBuf,
}

/// Knobs for a training run over the on-disk layout.
#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub test_ratio: f64,
    pub balance: bool,
    /// Fixes shuffling, balancing and splitting when set.
    pub seed: Option<u64>,
    pub workers: usize,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            balance: false,
            seed: None,
            workers: 4,
        }
    }
}

/// Fits and persists the KNN model of one classifier kind.
#[derive(Debug, Clone)]
pub struct KnnTrainer {
    kind: ClassifierKind,
    k: usize,
    extractor: FeatureExtractor,
    repository: ModelRepository,
}

impl KnnTrainer {
    pub fn new(kind: ClassifierKind, repository: ModelRepository) -> Self {
        Self {
            kind,
            k: KNearestNeighbors::DEFAULT_K,
            extractor: FeatureExtractor::default(),
            repository,
        }
    }

    pub fn train(&self, samples: Vec<LabeledSample>, test_ratio: f64) -> Result<TrainingOutcome, TrainingError> {
        self.train_with_rng(samples, test_ratio, &mut rand::rng())
    }

    /// Stratified split, fit on the training partition, score on the test
    /// partition, persist.
    pub fn train_with_rng<R>(
        &self,
        samples: Vec<LabeledSample>,
        test_ratio: f64,
        rng: &mut R,
    ) -> Result<TrainingOutcome, TrainingError>
    where
        R: Rng + ?Sized,
    {
        if samples.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }

        let dataset = Dataset::new(samples);
        let feature_len = dataset.feature_len()?;
        let expected = self.kind.feature_set().expected_len();
        if feature_len != expected {
            return Err(TrainingError::InconsistentFeatureLength {
                index: 0,
                expected,
                actual: feature_len,
            });
        }

        let classes = dataset.classes();
        let (train, test) = dataset.stratified_split(test_ratio, rng)?;
        let (train_count, test_count) = (train.len(), test.len());
        if train.is_empty() {
            return Err(TrainingError::EmptyTrainingSet { test_ratio });
        }

        info!(
            kind = %self.kind,
            train_count,
            test_count,
            classes = classes.len(),
            feature_len,
            "Training classifier"
        );

        let mut estimator = KNearestNeighbors::new(self.k);
        estimator.fit(train.into_samples());

        let accuracy = if test.is_empty() {
            0.0
        } else {
            let correct = test
                .samples()
                .iter()
                .filter(|s| estimator.predict(&s.features).as_deref() == Some(s.label.as_str()))
                .count();
            correct as f64 / test_count as f64
        };
        info!(kind = %self.kind, accuracy, "Evaluated classifier");

        let model = TrainedModel {
            algorithm: TrainedModel::ALGORITHM.to_string(),
            kind: self.kind,
            feature_set: self.kind.feature_set(),
            feature_len,
            classes,
            accuracy,
            train_count,
            test_count,
            trained_at: Utc::now(),
            estimator,
        };
        let model_path = self.repository.save(&model)?;

        Ok(TrainingOutcome {
            model,
            accuracy,
            train_count,
            test_count,
            model_path,
        })
    }

    /// Collects the labeled images under `layout`, extracts their features
    /// on blocking workers, optionally balances classes, then trains.
    /// Images that fail to decode are skipped.
    pub async fn train_from_layout(
        &self,
        layout: &TrainingLayout,
        options: &TrainingOptions,
    ) -> Result<TrainingOutcome, TrainingError> {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let images = layout.collect_images(self.kind)?;
        let samples = self.extract_samples(images, options.workers).await;
        info!(kind = %self.kind, samples = samples.len(), "Extracted training features");

        let samples = if options.balance {
            let by_class = Dataset::new(samples).by_class();
            DatasetBalancer::default()
                .balance(by_class, &mut rng)
                .into_values()
                .flatten()
                .collect()
        } else {
            samples
        };

        self.train_with_rng(samples, options.test_ratio, &mut rng)
    }

    async fn extract_samples(&self, images: IndexMap<String, Vec<PathBuf>>, workers: usize) -> Vec<LabeledSample> {
        let feature_set = self.kind.feature_set();
        let extractor = self.extractor;
        let jobs = images
            .into_iter()
            .flat_map(|(label, paths)| paths.into_iter().map(move |path| (path, label.clone())));

        // buffered keeps input order, so the dataset does not depend on scheduling
        let results: Vec<_> = stream::iter(jobs)
            .map(|(path, label)| async move {
                let task_path = path.clone();
                let joined =
                    tokio::task::spawn_blocking(move || extract_file(&extractor, &task_path, feature_set)).await;
                (path, label, joined)
            })
            .buffered(workers.max(1))
            .collect()
            .await;

        let mut samples = Vec::with_capacity(results.len());
        for (path, label, joined) in results {
            match joined {
                Ok(Ok(features)) => samples.push(LabeledSample::new(features, label)),
                Ok(Err(e)) => warn!(path = %path.display(), error = %e, "Skipping unreadable training image"),
                Err(e) => warn!(path = %path.display(), error = %e, "Feature extraction task failed"),
            }
        }
        samples
    }
}

fn extract_file(
    extractor: &FeatureExtractor,
    path: &Path,
    feature_set: FeatureSet,
) -> Result<FeatureVector, image::ImageError> {
    let rgb = image::open(path)?.to_rgb8();
    Ok(extractor.extract(&rgb, feature_set))
}
