use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::TrainingError;
use crate::pipeline::types::LabeledSample;

/// Labeled samples paired in collection order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    samples: Vec<LabeledSample>,
}

impl Dataset {
    pub fn new(samples: Vec<LabeledSample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<LabeledSample> {
        self.samples
    }

    /// Labels in order of first appearance.
    pub fn classes(&self) -> Vec<String> {
        self.by_class().into_keys().collect()
    }

    pub fn by_class(&self) -> IndexMap<String, Vec<LabeledSample>> {
        let mut strata: IndexMap<String, Vec<LabeledSample>> = IndexMap::new();
        for sample in &self.samples {
            strata.entry(sample.label.clone()).or_default().push(sample.clone());
        }
        strata
    }

    pub fn class_counts(&self) -> IndexMap<String, usize> {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for sample in &self.samples {
            *counts.entry(sample.label.clone()).or_default() += 1;
        }
        counts
    }

    /// Common feature length of every sample. Fails on the first sample that
    /// disagrees with the first one.
    pub fn feature_len(&self) -> Result<usize, TrainingError> {
        let expected = self
            .samples
            .first()
            .map(|s| s.features.len())
            .ok_or(TrainingError::EmptyDataset)?;

        for (index, sample) in self.samples.iter().enumerate() {
            if sample.features.len() != expected {
                return Err(TrainingError::InconsistentFeatureLength {
                    index,
                    expected,
                    actual: sample.features.len(),
                });
            }
        }
        Ok(expected)
    }

    /// Splits every class independently into `(train, test)`, shuffling
    /// within the class first. Each class sends `round(n * test_ratio)`
    /// samples to the test partition.
    pub fn stratified_split<R>(&self, test_ratio: f64, rng: &mut R) -> Result<(Dataset, Dataset), TrainingError>
    where
        R: Rng + ?Sized,
    {
        if !(0.0..1.0).contains(&test_ratio) {
            return Err(TrainingError::InvalidTestRatio(test_ratio));
        }

        let mut train = Vec::with_capacity(self.len());
        let mut test = Vec::new();

        for (_, mut stratum) in self.by_class() {
            stratum.shuffle(rng);
            let test_count = ((stratum.len() as f64) * test_ratio).round() as usize;
            let train_part = stratum.split_off(test_count.min(stratum.len()));
            test.extend(stratum);
            train.extend(train_part);
        }

        Ok((Dataset::new(train), Dataset::new(test)))
    }
}

impl From<Vec<LabeledSample>> for Dataset {
    fn from(samples: Vec<LabeledSample>) -> Self {
        Self::new(samples)
    }
}
