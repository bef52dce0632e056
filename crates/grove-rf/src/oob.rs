//! Out-of-bag (OOB) evaluation for Random Forest.

use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::error::RfError;
use crate::forest::RandomForest;
use crate::predict::majority_vote;
use crate::sampler::Bootstrap;

/// Out-of-bag evaluation result.
#[derive(Debug, Clone, PartialEq)]
pub struct OobScore {
    /// Fraction of evaluated samples whose OOB vote disagrees with the label.
    pub error: f64,
    /// Number of samples that had at least one OOB tree.
    pub n_oob_samples: usize,
    /// OOB confusion matrix: `confusion_matrix[true][predicted]`.
    pub confusion_matrix: Vec<Vec<usize>>,
}

impl OobScore {
    /// OOB accuracy, `1 - error`.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        1.0 - self.error
    }
}

/// Compute out-of-bag predictions and error.
///
/// For each sample, only trees where the sample was NOT in the bootstrap
/// vote. Samples that were in bag for every tree are left out of both the
/// numerator and the denominator. Returns `None` when no sample has any
/// OOB tree.
pub(crate) fn compute_oob(
    forest: &RandomForest,
    dataset: &Dataset,
    bootstraps: &[Bootstrap],
) -> Result<Option<OobScore>, RfError> {
    let n_samples = dataset.n_samples();
    let n_classes = forest.n_classes;
    let features = dataset.features();
    let labels = dataset.labels();

    let mut oob_votes = vec![vec![0usize; n_classes]; n_samples];
    let mut has_oob = vec![false; n_samples];

    for (tree_idx, (tree, bootstrap)) in forest.trees.iter().zip(bootstraps).enumerate() {
        for &si in bootstrap.out_of_bag() {
            let pred = tree
                .predict_sample(features, si)
                .map_err(|source| RfError::MalformedModel {
                    tree: tree_idx,
                    source,
                })?;
            oob_votes[si][pred] += 1;
            has_oob[si] = true;
        }
    }

    let n_oob_samples = has_oob.iter().filter(|&&h| h).count();
    if n_oob_samples == 0 {
        warn!(
            n_trees = forest.trees.len(),
            "no sample is out of bag for any tree; OOB error unavailable"
        );
        return Ok(None);
    }

    let mut confusion = vec![vec![0usize; n_classes]; n_classes];
    let mut wrong = 0usize;

    for ((votes, &evaluated), &label) in oob_votes.iter().zip(&has_oob).zip(labels) {
        if !evaluated {
            continue;
        }
        let predicted = majority_vote(votes);
        confusion[label][predicted] += 1;
        if predicted != label {
            wrong += 1;
        }
    }

    let error = wrong as f64 / n_oob_samples as f64;
    debug!(n_oob_samples, n_samples, error, "OOB evaluation complete");

    Ok(Some(OobScore {
        error,
        n_oob_samples,
        confusion_matrix: confusion,
    }))
}
