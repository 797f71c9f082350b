use indexmap::IndexMap;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use tracing::{debug, info};

/// Equalizes per-class counts before KNN training, which is sensitive to
/// local class density.
#[derive(Debug, Clone)]
pub struct DatasetBalancer {
    min_per_class: usize,
}

impl DatasetBalancer {
    pub const DEFAULT_MIN_PER_CLASS: usize = 50;

    pub fn new(min_per_class: usize) -> Self {
        Self { min_per_class }
    }

    /// `max(min_per_class, median)`, the median being the upper middle of the
    /// sorted counts.
    pub fn target_count(&self, counts: &[usize]) -> usize {
        if counts.is_empty() {
            return self.min_per_class;
        }
        let mut sorted = counts.to_vec();
        sorted.sort_unstable();
        sorted[sorted.len() / 2].max(self.min_per_class)
    }

    /// Subsamples classes above the target without replacement and tops up
    /// classes below it with random duplicates. Empty classes stay empty.
    pub fn balance<T, R>(&self, samples_by_class: IndexMap<String, Vec<T>>, rng: &mut R) -> IndexMap<String, Vec<T>>
    where
        T: Clone,
        R: Rng + ?Sized,
    {
        let counts: Vec<usize> = samples_by_class.values().map(Vec::len).collect();
        let target = self.target_count(&counts);
        info!(target_count = target, classes = counts.len(), "Balancing classes");

        samples_by_class
            .into_iter()
            .map(|(label, mut items)| {
                let count = items.len();
                if count > target {
                    items.shuffle(rng);
                    items.truncate(target);
                } else if count < target && !items.is_empty() {
                    let extra: Vec<T> = (0..target - count)
                        .filter_map(|_| items.choose(rng).cloned())
                        .collect();
                    items.extend(extra);
                }
                debug!(label = %label, before = count, after = items.len(), "Balanced class");
                (label, items)
            })
            .collect()
    }
}

impl Default for DatasetBalancer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_PER_CLASS)
    }
}
