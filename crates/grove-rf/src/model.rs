//! The durable training artifact and the top-level train/predict entry points.

use tracing::{info, instrument};

use crate::arrays::TreeArrays;
use crate::config::ForestConfig;
use crate::dataset::{Dataset, FeatureMatrix};
use crate::error::RfError;
use crate::forest::{RandomForest, TrainingResult};

/// A trained forest in interchange form, plus its evaluation summary.
///
/// This is the only artifact that outlives a training run. It carries no
/// training data; prediction needs only the trees.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Model {
    /// One entry per tree, in slot order.
    pub trees: Vec<TreeArrays>,
    /// Feature count the trees were grown on.
    pub n_features: usize,
    /// Number of classes.
    pub n_classes: usize,
    /// Feature column names.
    pub feature_names: Vec<String>,
    /// Class name for each class code.
    pub class_names: Vec<String>,
    /// Mean Gini importance per feature.
    pub gini_importance: Vec<f64>,
    /// OOB error, absent when no sample was ever out of bag.
    pub oob_error: Option<f64>,
    /// Mean permutation importance per feature, if requested.
    pub permutation_importance: Option<Vec<f64>>,
}

impl Model {
    /// Build the artifact from a training run.
    #[must_use]
    pub fn from_training(result: &TrainingResult) -> Self {
        let forest = result.forest();
        Self {
            trees: forest.to_arrays(),
            n_features: forest.n_features(),
            n_classes: forest.n_classes(),
            feature_names: result.feature_names().to_vec(),
            class_names: result.class_names().to_vec(),
            gini_importance: result.gini_importance().to_vec(),
            oob_error: result.oob_score().map(|s| s.error),
            permutation_importance: result.permutation_importance().map(|p| p.mean.clone()),
        }
    }

    /// Restore a predict-only forest from the stored arrays.
    ///
    /// # Errors
    ///
    /// | Variant                       | When                                   |
    /// |-------------------------------|----------------------------------------|
    /// | [`RfError::InvalidTreeCount`] | the model holds no trees               |
    /// | [`RfError::MalformedModel`]   | a tree violates the arena invariants   |
    pub fn forest(&self) -> Result<RandomForest, RfError> {
        RandomForest::init(&self.trees, self.n_features, self.n_classes)
    }

    /// Name of class `code`, falling back to the code itself.
    #[must_use]
    pub fn class_name(&self, code: usize) -> String {
        self.class_names
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }
}

/// Train a forest on `dataset` and package it as a [`Model`].
///
/// # Errors
///
/// Any error from [`ForestConfig::fit`].
#[instrument(skip_all, fields(num_trees = config.num_trees(), n_samples = dataset.n_samples()))]
pub fn train(dataset: &Dataset, config: &ForestConfig) -> Result<Model, RfError> {
    let result = config.fit(dataset)?;
    let model = Model::from_training(&result);
    info!(n_trees = model.trees.len(), oob_error = model.oob_error, "model ready");
    Ok(model)
}

/// Predict one class code per row of `features` by majority vote.
///
/// The model's arrays are validated before any row is classified.
///
/// # Errors
///
/// | Variant                                | When                                  |
/// |----------------------------------------|---------------------------------------|
/// | [`RfError::MalformedModel`]            | a tree violates the arena invariants  |
/// | [`RfError::PredictionFeatureMismatch`] | matrix width differs from the model   |
/// | [`RfError::InvalidThreadCount`]        | `num_threads` is zero                 |
/// | [`RfError::ThreadPool`]                | the worker pool could not be created  |
#[instrument(skip_all, fields(n_rows = features.n_rows(), num_threads = num_threads))]
pub fn predict(model: &Model, features: &FeatureMatrix, num_threads: usize) -> Result<Vec<usize>, RfError> {
    model.forest()?.predict_batch(features, num_threads)
}
