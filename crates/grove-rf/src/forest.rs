//! Random Forest training with parallel tree construction.

use tracing::{debug, info, instrument};

use crate::arrays::TreeArrays;
use crate::config::{ForestConfig, PermutationMode};
use crate::dataset::Dataset;
use crate::error::RfError;
use crate::importance::average_importances;
use crate::oob::{OobScore, compute_oob};
use crate::perm_importance::{PermutationImportance, compute_permutation_importance};
use crate::pool::WorkerPool;
use crate::sampler::Bootstrap;
use crate::seed::{growth_rng, tree_seeds};
use crate::tree::{self, DecisionTree};

/// A fitted Random Forest ensemble.
///
/// Holds only the trees; training data is borrowed for the duration of a
/// call and never retained.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl RandomForest {
    pub(crate) fn from_trees(trees: Vec<DecisionTree>, n_features: usize, n_classes: usize) -> Self {
        Self {
            trees,
            n_features,
            n_classes,
        }
    }

    /// Restore a forest from externally supplied node arrays without growing it.
    ///
    /// Every tree is checked against the arena invariants before it is
    /// accepted.
    ///
    /// # Errors
    ///
    /// | Variant                       | When                                            |
    /// |-------------------------------|-------------------------------------------------|
    /// | [`RfError::InvalidTreeCount`] | `trees` is empty                                |
    /// | [`RfError::MalformedModel`]   | a tree's arrays violate the arena invariants    |
    pub fn init(trees: &[TreeArrays], n_features: usize, n_classes: usize) -> Result<Self, RfError> {
        if trees.is_empty() {
            return Err(RfError::InvalidTreeCount { num_trees: 0 });
        }
        let trees = trees
            .iter()
            .enumerate()
            .map(|(tree_idx, arrays)| {
                DecisionTree::from_arrays(arrays, n_features, n_classes).map_err(|source| {
                    RfError::MalformedModel {
                        tree: tree_idx,
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(n_trees = trees.len(), n_features, n_classes, "forest restored");
        Ok(Self::from_trees(trees, n_features, n_classes))
    }

    /// Export every tree as parallel node arrays.
    #[must_use]
    pub fn to_arrays(&self) -> Vec<TreeArrays> {
        self.trees.iter().map(DecisionTree::to_arrays).collect()
    }

    /// Borrow the trees in slot order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Metadata about the training run.
#[derive(Debug, Clone)]
pub struct TrainingMetadata {
    /// Number of trees trained.
    pub num_trees: usize,
    /// Number of features in the dataset.
    pub n_features: usize,
    /// Number of classes.
    pub n_classes: usize,
    /// Number of training samples.
    pub n_samples: usize,
    /// Resolved number of candidate features per split.
    pub mtry: usize,
    /// In-bag draws per tree.
    pub draw_count: usize,
    /// Worker threads used for growth.
    pub n_workers: usize,
}

/// Result of Random Forest training.
///
/// Besides the fitted forest this keeps what on-demand permutation
/// importance needs: each tree's bootstrap and seed.
#[derive(Debug)]
pub struct TrainingResult {
    forest: RandomForest,
    gini_importance: Vec<f64>,
    oob_score: Option<OobScore>,
    permutation_importance: Option<PermutationImportance>,
    bootstraps: Vec<Bootstrap>,
    tree_seeds: Vec<u64>,
    feature_names: Vec<String>,
    class_names: Vec<String>,
    num_threads: usize,
    metadata: TrainingMetadata,
}

impl TrainingResult {
    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Mean Gini importance per feature (average over all trees).
    #[must_use]
    pub fn gini_importance(&self) -> &[f64] {
        &self.gini_importance
    }

    /// OOB score, absent when no sample was ever out of bag.
    #[must_use]
    pub fn oob_score(&self) -> Option<&OobScore> {
        self.oob_score.as_ref()
    }

    /// Permutation importance, if it was requested at training time.
    #[must_use]
    pub fn permutation_importance(&self) -> Option<&PermutationImportance> {
        self.permutation_importance.as_ref()
    }

    /// Per-tree bootstrap samples, in tree slot order.
    #[must_use]
    pub fn bootstraps(&self) -> &[Bootstrap] {
        &self.bootstraps
    }

    /// Per-tree seeds, in tree slot order.
    #[must_use]
    pub fn tree_seeds(&self) -> &[u64] {
        &self.tree_seeds
    }

    /// Feature column names of the training data.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Class names of the training data.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }

    /// Compute permutation importance on demand.
    ///
    /// `dataset` must be the data the forest was trained on. Each tree
    /// permutes with its own dedicated random stream, so repeated calls
    /// return identical values.
    ///
    /// # Errors
    ///
    /// | Variant                           | When                                       |
    /// |-----------------------------------|--------------------------------------------|
    /// | [`RfError::TrainingDataMismatch`] | `dataset` has a different number of rows   |
    /// | [`RfError::PredictionFeatureMismatch`] | `dataset` has a different width       |
    /// | [`RfError::ThreadPool`]           | the worker pool could not be created       |
    pub fn compute_permutation_importance(
        &self,
        dataset: &Dataset,
    ) -> Result<PermutationImportance, RfError> {
        if dataset.n_samples() != self.metadata.n_samples {
            return Err(RfError::TrainingDataMismatch {
                expected: self.metadata.n_samples,
                got: dataset.n_samples(),
            });
        }
        if dataset.n_features() != self.forest.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.forest.n_features,
                got: dataset.n_features(),
            });
        }
        compute_permutation_importance(
            &self.forest,
            dataset,
            &self.bootstraps,
            &self.tree_seeds,
            self.num_threads,
        )
    }
}

/// One tree's share of the training output.
struct GrownTree {
    tree: DecisionTree,
    gini_importance: Vec<f64>,
    bootstrap: Bootstrap,
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(num_trees = config.num_trees, n_samples = dataset.n_samples()))]
pub(crate) fn train(config: &ForestConfig, dataset: &Dataset) -> Result<TrainingResult, RfError> {
    let mtry = config.validate(dataset)?;

    let n_samples = dataset.n_samples();
    let n_features = dataset.n_features();
    let n_classes = dataset.n_classes();
    let draw_count = config.draw_count(n_samples);
    let replace = config.replace;

    // Seeds are fixed on this thread before any worker starts.
    let seeds = tree_seeds(config.seed, config.num_trees);
    let pool = WorkerPool::new(config.num_threads, config.num_trees)?;

    info!(
        num_trees = config.num_trees,
        n_samples,
        n_features,
        n_classes,
        mtry,
        draw_count,
        replace,
        n_workers = pool.n_workers(),
        "training random forest"
    );

    let grown = pool.map_round_robin(config.num_trees, |tree_idx| {
        let mut rng = growth_rng(seeds[tree_idx]);
        let bootstrap = Bootstrap::draw(n_samples, draw_count, replace, &mut rng);
        let growth = tree::grow(dataset, bootstrap.in_bag(), mtry, &mut rng);
        debug!(
            tree_idx,
            n_nodes = growth.tree.n_nodes(),
            n_leaves = growth.tree.n_leaves(),
            depth = growth.tree.depth(),
            n_oob = bootstrap.out_of_bag().len(),
            "tree grown"
        );
        Ok(GrownTree {
            tree: growth.tree,
            gini_importance: growth.gini_importance,
            bootstrap,
        })
    })?;

    let mut trees = Vec::with_capacity(config.num_trees);
    let mut per_tree_importance = Vec::with_capacity(config.num_trees);
    let mut bootstraps = Vec::with_capacity(config.num_trees);
    for g in grown {
        trees.push(g.tree);
        per_tree_importance.push(g.gini_importance);
        bootstraps.push(g.bootstrap);
    }

    let gini_importance = average_importances(&per_tree_importance, n_features);
    let forest = RandomForest::from_trees(trees, n_features, n_classes);

    debug!(n_trees_trained = forest.trees.len(), "tree training complete");

    let oob_score = compute_oob(&forest, dataset, &bootstraps)?;

    let permutation_importance = match config.permutation_mode {
        PermutationMode::Enabled => Some(compute_permutation_importance(
            &forest,
            dataset,
            &bootstraps,
            &seeds,
            config.num_threads,
        )?),
        PermutationMode::Disabled => None,
    };

    let metadata = TrainingMetadata {
        num_trees: config.num_trees,
        n_features,
        n_classes,
        n_samples,
        mtry,
        draw_count,
        n_workers: pool.n_workers(),
    };

    info!(
        oob_error = oob_score.as_ref().map(|s| s.error),
        "random forest training complete"
    );

    Ok(TrainingResult {
        forest,
        gini_importance,
        oob_score,
        permutation_importance,
        bootstraps,
        tree_seeds: seeds,
        feature_names: dataset.feature_names().to_vec(),
        class_names: dataset.class_names().to_vec(),
        num_threads: config.num_threads,
        metadata,
    })
}
