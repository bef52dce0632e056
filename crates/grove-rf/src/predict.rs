//! Majority-vote prediction for the Random Forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::dataset::FeatureMatrix;
use crate::error::RfError;
use crate::forest::RandomForest;
use crate::pool::WorkerPool;

/// Index of the largest count; ties go to the lowest index.
///
/// Returns 0 for an empty slice.
#[must_use]
pub fn majority_vote(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best
}

/// Per-class vote counts for one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTally {
    counts: Vec<usize>,
}

impl VoteTally {
    pub(crate) fn new(counts: Vec<usize>) -> Self {
        Self { counts }
    }

    /// Return the winning class (lowest class code on ties).
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        majority_vote(&self.counts)
    }

    /// Return the raw vote count of every class.
    #[must_use]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }
}

impl RandomForest {
    /// Predict the class label for a single row-major sample.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                            |
    /// |---------------------------------------|---------------------------------|
    /// | [`RfError::PredictionFeatureMismatch`] | `sample.len() != n_features`    |
    /// | [`RfError::MalformedModel`]           | a tree's arena is corrupt       |
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        Ok(self.votes(sample)?.predicted_class())
    }

    /// Collect every tree's vote for a single row-major sample.
    ///
    /// # Errors
    ///
    /// Same as [`RandomForest::predict`].
    pub fn votes(&self, sample: &[f64]) -> Result<VoteTally, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut counts = vec![0usize; self.n_classes];
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            let class = tree
                .predict_row(sample)
                .map_err(|source| RfError::MalformedModel {
                    tree: tree_idx,
                    source,
                })?;
            counts[class] += 1;
        }
        Ok(VoteTally::new(counts))
    }

    /// Collect every tree's vote for row `sample` of `features`.
    pub(crate) fn votes_for_row(
        &self,
        features: &FeatureMatrix,
        sample: usize,
    ) -> Result<VoteTally, RfError> {
        let mut counts = vec![0usize; self.n_classes];
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            let class = tree
                .predict_sample(features, sample)
                .map_err(|source| RfError::MalformedModel {
                    tree: tree_idx,
                    source,
                })?;
            counts[class] += 1;
        }
        Ok(VoteTally::new(counts))
    }

    /// Predict class labels for every row of `features` using `num_threads` workers.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                                  |
    /// |---------------------------------------|---------------------------------------|
    /// | [`RfError::PredictionFeatureMismatch`] | matrix width differs from the model   |
    /// | [`RfError::InvalidThreadCount`]       | `num_threads` is zero                 |
    /// | [`RfError::ThreadPool`]               | the worker pool could not be created  |
    /// | [`RfError::MalformedModel`]           | a tree's arena is corrupt             |
    pub fn predict_batch(
        &self,
        features: &FeatureMatrix,
        num_threads: usize,
    ) -> Result<Vec<usize>, RfError> {
        if features.n_features() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: features.n_features(),
            });
        }
        let pool = WorkerPool::new(num_threads, features.n_rows())?;
        pool.install(|| {
            (0..features.n_rows())
                .into_par_iter()
                .map(|sample| {
                    self.votes_for_row(features, sample)
                        .map(|tally| tally.predicted_class())
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FeatureIndex, Node, NodeIndex};
    use crate::tree::DecisionTree;

    fn leaf_tree(class: usize) -> DecisionTree {
        DecisionTree {
            nodes: vec![Node::Leaf { prediction: class }],
        }
    }

    fn stump(threshold: f64, below: usize, above: usize) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: FeatureIndex::new(0),
                    threshold,
                    left: NodeIndex::new(1),
                    right: NodeIndex::new(2),
                },
                Node::Leaf { prediction: below },
                Node::Leaf { prediction: above },
            ],
        }
    }

    #[test]
    fn majority_vote_basic() {
        assert_eq!(majority_vote(&[3, 2]), 0);
        assert_eq!(majority_vote(&[1, 4, 2]), 1);
        assert_eq!(majority_vote(&[]), 0);
    }

    #[test]
    fn majority_vote_ties_go_low() {
        assert_eq!(majority_vote(&[2, 2]), 0);
        assert_eq!(majority_vote(&[0, 3, 3, 1]), 1);
    }

    #[test]
    fn five_trees_vote_zero() {
        let forest = RandomForest::from_trees(
            [0, 0, 1, 0, 1].into_iter().map(leaf_tree).collect(),
            1,
            2,
        );
        let tally = forest.votes(&[0.0]).unwrap();
        assert_eq!(tally.counts(), &[3, 2]);
        assert_eq!(forest.predict(&[0.0]).unwrap(), 0);
    }

    #[test]
    fn tally_ties_go_to_lowest_class() {
        let tally = VoteTally::new(vec![1, 3, 0, 3]);
        assert_eq!(tally.predicted_class(), 1);
    }

    #[test]
    fn width_mismatch_rejected() {
        let forest = RandomForest::from_trees(vec![leaf_tree(0)], 2, 1);
        assert!(matches!(
            forest.predict(&[1.0]).unwrap_err(),
            RfError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn batch_matches_single() {
        let forest = RandomForest::from_trees(
            vec![stump(5.0, 0, 1), stump(3.0, 0, 1), stump(8.0, 0, 2)],
            1,
            3,
        );
        let rows: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64]).collect();
        let matrix = FeatureMatrix::from_rows(&rows).unwrap();
        let batch = forest.predict_batch(&matrix, 3).unwrap();
        for (row, &pred) in rows.iter().zip(&batch) {
            assert_eq!(forest.predict(row).unwrap(), pred);
        }
        // x=6: votes [1, 2, 0] -> 1; x=2: all three vote 0.
        assert_eq!(batch[2], 0);
        assert_eq!(batch[6], 1);
    }

    #[test]
    fn corrupt_tree_surfaces_tree_index() {
        let broken = DecisionTree {
            nodes: vec![Node::Split {
                feature: FeatureIndex::new(0),
                threshold: 0.0,
                left: NodeIndex::new(3),
                right: NodeIndex::new(3),
            }],
        };
        let forest = RandomForest::from_trees(vec![leaf_tree(0), broken], 1, 1);
        assert!(matches!(
            forest.predict(&[1.0]).unwrap_err(),
            RfError::MalformedModel { tree: 1, .. }
        ));
    }
}
