use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::pipeline::types::{FeatureVector, LabeledSample};

/// Brute-force k-nearest-neighbors over Euclidean distance. The whole
/// training set is the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNearestNeighbors {
    k: usize,
    samples: Vec<LabeledSample>,
}

struct Vote {
    count: usize,
    distance: f64,
    first_rank: usize,
}

impl KNearestNeighbors {
    pub const DEFAULT_K: usize = 5;

    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            samples: Vec::new(),
        }
    }

    pub fn fit(&mut self, samples: Vec<LabeledSample>) {
        self.samples = samples;
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    pub fn is_fitted(&self) -> bool {
        !self.samples.is_empty()
    }

    /// Majority label among the `k` closest samples (all of them when fewer
    /// than `k` are stored). Ties go to the label whose voters are closer in
    /// total, then to the label of the nearer neighbor.
    pub fn predict(&self, query: &FeatureVector) -> Option<String> {
        let mut neighbors: Vec<(f64, &str)> = self
            .samples
            .iter()
            .map(|s| (s.features.squared_distance(query), s.label.as_str()))
            .collect();
        // stable: equidistant samples keep training order
        neighbors.sort_by(|a, b| a.0.total_cmp(&b.0));
        neighbors.truncate(self.k);

        let mut votes: IndexMap<&str, Vote> = IndexMap::new();
        for (rank, (squared, label)) in neighbors.into_iter().enumerate() {
            let vote = votes.entry(label).or_insert(Vote {
                count: 0,
                distance: 0.0,
                first_rank: rank,
            });
            vote.count += 1;
            vote.distance += squared.sqrt();
        }

        votes
            .into_iter()
            .min_by(|(_, a), (_, b)| {
                b.count
                    .cmp(&a.count)
                    .then(a.distance.total_cmp(&b.distance))
                    .then(a.first_rank.cmp(&b.first_rank))
            })
            .map(|(label, _)| label.to_string())
    }

    pub fn predict_batch(&self, queries: &[FeatureVector]) -> Vec<Option<String>> {
        queries.iter().map(|q| self.predict(q)).collect()
    }
}

impl Default for KNearestNeighbors {
    fn default() -> Self {
        Self::new(Self::DEFAULT_K)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f32, y: f32, label: &str) -> LabeledSample {
        LabeledSample::new(vec![x, y], label)
    }

    fn query(x: f32, y: f32) -> FeatureVector {
        FeatureVector::new(vec![x, y])
    }

    #[test]
    fn predicts_majority_of_nearest_neighbors() {
        let mut knn = KNearestNeighbors::default();
        knn.fit(vec![
            sample(0.0, 0.0, "true"),
            sample(0.0, 1.0, "true"),
            sample(1.0, 0.0, "true"),
            sample(10.0, 10.0, "false"),
            sample(10.0, 11.0, "false"),
            sample(11.0, 10.0, "false"),
        ]);

        assert_eq!(knn.predict(&query(0.5, 0.5)).as_deref(), Some("true"));
        assert_eq!(knn.predict(&query(10.5, 10.5)).as_deref(), Some("false"));
        assert_eq!(
            knn.predict_batch(&[query(0.0, 0.0), query(11.0, 11.0)]),
            vec![Some("true".to_string()), Some("false".to_string())]
        );
    }

    #[test]
    fn uses_every_sample_when_fewer_than_k() {
        let mut knn = KNearestNeighbors::default();
        knn.fit(vec![sample(0.0, 0.0, "Front"), sample(5.0, 5.0, "Back"), sample(6.0, 6.0, "Back")]);
        // three voters: Back wins 2-1 even though Front is nearest
        assert_eq!(knn.predict(&query(0.0, 0.0)).as_deref(), Some("Back"));
    }

    #[test]
    fn vote_ties_go_to_closer_label() {
        let mut knn = KNearestNeighbors::new(4);
        knn.fit(vec![
            sample(1.0, 0.0, "Front"),
            sample(-1.0, 0.0, "Front"),
            sample(2.0, 0.0, "Back"),
            sample(-2.0, 0.0, "Back"),
        ]);
        assert_eq!(knn.predict(&query(0.0, 0.0)).as_deref(), Some("Front"));
    }

    #[test]
    fn unfitted_model_predicts_nothing() {
        let knn = KNearestNeighbors::default();
        assert!(!knn.is_fitted());
        assert_eq!(knn.predict(&query(0.0, 0.0)), None);
    }
}
