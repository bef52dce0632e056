//! Configuration builder for Random Forest training.

use crate::dataset::Dataset;
use crate::error::RfError;
use crate::forest::TrainingResult;

/// Strategy for determining `mtry`, the number of candidate features per split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// Square root of total features, rounded up.
    Sqrt,
    /// Log base 2 of total features, rounded up (at least 1).
    Log2,
    /// A fraction of total features (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All features (no subsampling).
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete `mtry` for a dataset with `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidMtry`] when the result is outside `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> Result<usize, RfError> {
        let mtry = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        if mtry == 0 || mtry > n_features {
            return Err(RfError::InvalidMtry { mtry, n_features });
        }
        Ok(mtry)
    }
}

/// Whether to compute permutation importance as part of training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermutationMode {
    /// Compute permutation importance after growth.
    Enabled,
    /// Only Gini importance is computed.
    Disabled,
}

/// Configuration for Random Forest training.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter          | Default     |
/// |--------------------|-------------|
/// | `max_features`     | `Sqrt`      |
/// | `replace`          | `true`      |
/// | `sample_fraction`  | 1.0         |
/// | `num_threads`      | 1           |
/// | `seed`             | 42          |
/// | `permutation_mode` | `Disabled`  |
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub(crate) num_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) replace: bool,
    pub(crate) sample_fraction: f64,
    pub(crate) num_threads: usize,
    pub(crate) seed: u64,
    pub(crate) permutation_mode: PermutationMode,
}

impl ForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `num_trees` is zero.
    pub fn new(num_trees: usize) -> Result<Self, RfError> {
        if num_trees == 0 {
            return Err(RfError::InvalidTreeCount { num_trees });
        }
        Ok(Self {
            num_trees,
            max_features: MaxFeatures::Sqrt,
            replace: true,
            sample_fraction: 1.0,
            num_threads: 1,
            seed: 42,
            permutation_mode: PermutationMode::Disabled,
        })
    }

    // --- Setters ---

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set `mtry` directly. Shorthand for `with_max_features(MaxFeatures::Fixed(mtry))`.
    #[must_use]
    pub fn with_mtry(self, mtry: usize) -> Self {
        self.with_max_features(MaxFeatures::Fixed(mtry))
    }

    /// Draw bootstrap samples with (`true`) or without (`false`) replacement.
    #[must_use]
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Set the fraction of samples drawn into each tree's bootstrap.
    #[must_use]
    pub fn with_sample_fraction(mut self, sample_fraction: f64) -> Self {
        self.sample_fraction = sample_fraction;
        self
    }

    /// Set the number of worker threads used for growth and importance.
    #[must_use]
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Set the master seed from which every tree's random stream is derived.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the permutation importance mode.
    #[must_use]
    pub fn with_permutation_mode(mut self, permutation_mode: PermutationMode) -> Self {
        self.permutation_mode = permutation_mode;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn num_trees(&self) -> usize {
        self.num_trees
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return whether bootstrap sampling uses replacement.
    #[must_use]
    pub fn replace(&self) -> bool {
        self.replace
    }

    /// Return the bootstrap sample fraction.
    #[must_use]
    pub fn sample_fraction(&self) -> f64 {
        self.sample_fraction
    }

    /// Return the number of worker threads.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Return the master seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the permutation importance mode.
    #[must_use]
    pub fn permutation_mode(&self) -> PermutationMode {
        self.permutation_mode
    }

    /// Check every hyperparameter against `dataset` and return the resolved `mtry`.
    ///
    /// Runs before any tree is grown, so an invalid configuration never
    /// produces partial state.
    pub(crate) fn validate(&self, dataset: &Dataset) -> Result<usize, RfError> {
        let mtry = self.max_features.resolve(dataset.n_features())?;

        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            return Err(RfError::InvalidSampleFraction {
                fraction: self.sample_fraction,
            });
        }
        if self.draw_count(dataset.n_samples()) == 0 {
            return Err(RfError::EmptyBootstrap {
                n_samples: dataset.n_samples(),
                fraction: self.sample_fraction,
            });
        }
        if self.num_threads == 0 {
            return Err(RfError::InvalidThreadCount {
                num_threads: self.num_threads,
            });
        }
        Ok(mtry)
    }

    /// Number of in-bag draws per tree: `floor(n_samples * sample_fraction)`.
    pub(crate) fn draw_count(&self, n_samples: usize) -> usize {
        (n_samples as f64 * self.sample_fraction).floor() as usize
    }

    /// Train a Random Forest on `dataset`.
    ///
    /// # Errors
    ///
    /// | Variant                            | When                                         |
    /// |------------------------------------|----------------------------------------------|
    /// | [`RfError::InvalidMtry`]           | resolved mtry is outside [1, n_features]     |
    /// | [`RfError::InvalidSampleFraction`] | sample_fraction is not in (0.0, 1.0]         |
    /// | [`RfError::EmptyBootstrap`]        | floor(n * sample_fraction) is zero           |
    /// | [`RfError::InvalidThreadCount`]    | num_threads is zero                          |
    /// | [`RfError::ThreadPool`]            | the worker pool could not be created         |
    pub fn fit(&self, dataset: &Dataset) -> Result<TrainingResult, RfError> {
        crate::forest::train(self, dataset)
    }
}
