//! Permutation-based feature importance.

use tracing::{debug, instrument, warn};

use crate::dataset::Dataset;
use crate::error::RfError;
use crate::forest::RandomForest;
use crate::pool::WorkerPool;
use crate::sampler::Bootstrap;
use crate::seed::permutation_rng;

/// Forest-level permutation importance.
#[derive(Debug, Clone, PartialEq)]
pub struct PermutationImportance {
    /// Mean OOB error increase per feature over contributing trees.
    pub mean: Vec<f64>,
    /// Population standard deviation of the per-tree increases.
    pub std: Vec<f64>,
    /// Trees with a non-empty OOB set, i.e. the ones averaged over.
    pub n_trees_used: usize,
}

/// One worker's private running sums.
struct PartialSums {
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
    n_trees: usize,
}

impl PartialSums {
    fn new(n_features: usize) -> Self {
        Self {
            sum: vec![0.0; n_features],
            sum_sq: vec![0.0; n_features],
            n_trees: 0,
        }
    }

    fn add(&mut self, importance: &[f64]) {
        for ((s, sq), &v) in self.sum.iter_mut().zip(&mut self.sum_sq).zip(importance) {
            *s += v;
            *sq += v * v;
        }
        self.n_trees += 1;
    }

    fn merge(&mut self, other: &PartialSums) {
        for (s, &o) in self.sum.iter_mut().zip(&other.sum) {
            *s += o;
        }
        for (sq, &o) in self.sum_sq.iter_mut().zip(&other.sum_sq) {
            *sq += o;
        }
        self.n_trees += other.n_trees;
    }
}

/// Compute permutation importance for every feature across the forest.
///
/// Trees are split round-robin across `min(num_threads, n_trees)` workers.
/// Each worker keeps its own [`PartialSums`]; they are merged in worker
/// order once all workers have joined. Trees with an empty OOB set are
/// skipped. When no tree contributes, every importance is zero.
#[instrument(skip_all, fields(n_trees = forest.trees.len(), num_threads = num_threads))]
pub(crate) fn compute_permutation_importance(
    forest: &RandomForest,
    dataset: &Dataset,
    bootstraps: &[Bootstrap],
    tree_seeds: &[u64],
    num_threads: usize,
) -> Result<PermutationImportance, RfError> {
    let n_features = dataset.n_features();
    let n_trees = forest.trees.len();
    let pool = WorkerPool::new(num_threads, n_trees)?;

    let partials = pool.fold_round_robin(
        n_trees,
        || PartialSums::new(n_features),
        |acc: &mut PartialSums, tree_idx| {
            let mut rng = permutation_rng(tree_seeds[tree_idx]);
            let importance = forest.trees[tree_idx]
                .permutation_importance(dataset, bootstraps[tree_idx].out_of_bag(), &mut rng)
                .map_err(|source| RfError::MalformedModel {
                    tree: tree_idx,
                    source,
                })?;
            if let Some(importance) = importance {
                acc.add(&importance);
            }
            Ok(())
        },
    )?;

    let mut total = PartialSums::new(n_features);
    for partial in &partials {
        total.merge(partial);
    }

    if total.n_trees == 0 {
        warn!(n_trees, "no tree has out-of-bag samples; permutation importance is zero");
        return Ok(PermutationImportance {
            mean: vec![0.0; n_features],
            std: vec![0.0; n_features],
            n_trees_used: 0,
        });
    }

    let n = total.n_trees as f64;
    let mean: Vec<f64> = total.sum.iter().map(|&s| s / n).collect();
    let std = total
        .sum_sq
        .iter()
        .zip(&mean)
        .map(|(&sq, &m)| (sq / n - m * m).max(0.0).sqrt())
        .collect();

    debug!(
        n_trees_used = total.n_trees,
        n_workers = pool.n_workers(),
        "permutation importance complete"
    );

    Ok(PermutationImportance {
        mean,
        std,
        n_trees_used: total.n_trees,
    })
}
