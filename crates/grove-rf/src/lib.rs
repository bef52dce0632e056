//! Random Forest classification: train, evaluate, predict.
//!
//! Trees are grown by CART-style binary splitting on a sum-of-squares
//! impurity score, each from its own bootstrap sample and its own seeded
//! random stream, spread round-robin over a bounded rayon worker pool.
//! The ensemble predicts by majority vote and reports out-of-bag error,
//! Gini importance and (on request) permutation importance.
//!
//! A trained forest is exported as a [`Model`]: parallel node arrays per
//! tree, validated again when restored, plus the evaluation summary.

mod arrays;
mod config;
mod dataset;
mod error;
mod forest;
mod importance;
mod model;
mod node;
mod oob;
mod perm_importance;
mod pool;
mod predict;
mod sampler;
mod seed;
mod serialize;
mod split;
mod tree;

pub use arrays::TreeArrays;
pub use config::{ForestConfig, MaxFeatures, PermutationMode};
pub use dataset::{Dataset, FeatureMatrix};
pub use error::{MalformedTree, RfError};
pub use forest::{RandomForest, TrainingMetadata, TrainingResult};
pub use importance::{RankedFeature, rank_features};
pub use model::{Model, predict, train};
pub use node::{FeatureIndex, Node, NodeIndex};
pub use oob::OobScore;
pub use perm_importance::PermutationImportance;
pub use predict::{VoteTally, majority_vote};
pub use sampler::Bootstrap;
pub use seed::tree_seeds;
pub use tree::{DecisionTree, Growth, grow};
