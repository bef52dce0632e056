//! Parallel-array interchange format for a single tree.
//!
//! Node `i` of a tree is described by the `i`-th entry of four equal-length
//! arrays. `left_child[i] == 0` marks node `i` as a leaf, in which case
//! `split_feature_or_label[i]` holds the predicted class code instead of a
//! feature index. The sentinel works because the root (index 0) is never a
//! child of any node.

use crate::error::MalformedTree;
use crate::node::{FeatureIndex, Node, NodeIndex};
use crate::tree::DecisionTree;

/// One tree as four parallel node arrays.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TreeArrays {
    /// Split feature of an internal node, predicted class of a leaf.
    pub split_feature_or_label: Vec<usize>,
    /// Split threshold; `0.0` for leaves.
    pub split_threshold: Vec<f64>,
    /// Left child index; `0` marks a leaf.
    pub left_child: Vec<usize>,
    /// Right child index; `0` for leaves.
    pub right_child: Vec<usize>,
}

impl TreeArrays {
    /// Number of nodes described, or `None` if the arrays disagree in length.
    #[must_use]
    pub fn n_nodes(&self) -> Option<usize> {
        let n = self.split_feature_or_label.len();
        (self.split_threshold.len() == n && self.left_child.len() == n && self.right_child.len() == n)
            .then_some(n)
    }
}

impl DecisionTree {
    /// Export the node arena as parallel arrays.
    #[must_use]
    pub fn to_arrays(&self) -> TreeArrays {
        let n = self.nodes.len();
        let mut arrays = TreeArrays {
            split_feature_or_label: Vec::with_capacity(n),
            split_threshold: Vec::with_capacity(n),
            left_child: Vec::with_capacity(n),
            right_child: Vec::with_capacity(n),
        };
        for node in &self.nodes {
            let (slot, threshold, left, right) = match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => (feature.index(), *threshold, left.index(), right.index()),
                Node::Leaf { prediction } => (*prediction, 0.0, 0, 0),
            };
            arrays.split_feature_or_label.push(slot);
            arrays.split_threshold.push(threshold);
            arrays.left_child.push(left);
            arrays.right_child.push(right);
        }
        arrays
    }

    /// Rebuild a tree from parallel arrays, checking every arena invariant.
    ///
    /// # Errors
    ///
    /// | Variant                                  | When                                   |
    /// |------------------------------------------|----------------------------------------|
    /// | [`MalformedTree::LengthMismatch`]        | the four arrays differ in length       |
    /// | [`MalformedTree::Empty`]                 | the arrays are empty                   |
    /// | [`MalformedTree::ChildOutOfRange`]       | a child index is `>= n_nodes`          |
    /// | [`MalformedTree::ChildNotAfterParent`]   | a child index is `<=` its parent's     |
    /// | [`MalformedTree::FeatureOutOfRange`]     | a split feature is `>= n_features`     |
    /// | [`MalformedTree::LabelOutOfRange`]       | a leaf label is `>= n_classes`         |
    pub fn from_arrays(
        arrays: &TreeArrays,
        n_features: usize,
        n_classes: usize,
    ) -> Result<Self, MalformedTree> {
        let n_nodes = arrays.n_nodes().ok_or(MalformedTree::LengthMismatch {
            features: arrays.split_feature_or_label.len(),
            thresholds: arrays.split_threshold.len(),
            lefts: arrays.left_child.len(),
            rights: arrays.right_child.len(),
        })?;
        if n_nodes == 0 {
            return Err(MalformedTree::Empty);
        }

        let mut nodes = Vec::with_capacity(n_nodes);
        for node in 0..n_nodes {
            let slot = arrays.split_feature_or_label[node];
            let left = arrays.left_child[node];

            if left == 0 {
                if slot >= n_classes {
                    return Err(MalformedTree::LabelOutOfRange {
                        node,
                        label: slot,
                        n_classes,
                    });
                }
                nodes.push(Node::Leaf { prediction: slot });
                continue;
            }

            if slot >= n_features {
                return Err(MalformedTree::FeatureOutOfRange {
                    node,
                    feature: slot,
                    n_features,
                });
            }
            let right = arrays.right_child[node];
            for child in [left, right] {
                if child >= n_nodes {
                    return Err(MalformedTree::ChildOutOfRange {
                        node,
                        child,
                        n_nodes,
                    });
                }
                if child <= node {
                    return Err(MalformedTree::ChildNotAfterParent { node, child });
                }
            }
            nodes.push(Node::Split {
                feature: FeatureIndex::new(slot),
                threshold: arrays.split_threshold[node],
                left: NodeIndex::new(left),
                right: NodeIndex::new(right),
            });
        }

        Ok(DecisionTree { nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Root splits feature 1 at 2.5; left leaf class 0, right leaf class 2.
    fn stump_arrays() -> TreeArrays {
        TreeArrays {
            split_feature_or_label: vec![1, 0, 2],
            split_threshold: vec![2.5, 0.0, 0.0],
            left_child: vec![1, 0, 0],
            right_child: vec![2, 0, 0],
        }
    }

    #[test]
    fn stump_decodes_and_predicts() {
        let tree = DecisionTree::from_arrays(&stump_arrays(), 2, 3).unwrap();
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.predict_row(&[9.0, 1.0]).unwrap(), 0);
        assert_eq!(tree.predict_row(&[9.0, 2.5]).unwrap(), 2);
        assert_eq!(tree.to_arrays(), stump_arrays());
    }

    #[test]
    fn leaf_label_lives_in_feature_slot() {
        let tree = DecisionTree {
            nodes: vec![Node::Leaf { prediction: 4 }],
        };
        let arrays = tree.to_arrays();
        assert_eq!(arrays.split_feature_or_label, vec![4]);
        assert_eq!(arrays.left_child, vec![0]);
    }

    #[test]
    fn length_mismatch_rejected() {
        let mut arrays = stump_arrays();
        arrays.right_child.pop();
        assert_eq!(
            DecisionTree::from_arrays(&arrays, 2, 3).unwrap_err(),
            MalformedTree::LengthMismatch {
                features: 3,
                thresholds: 3,
                lefts: 3,
                rights: 2,
            }
        );
    }

    #[test]
    fn empty_rejected() {
        let arrays = TreeArrays {
            split_feature_or_label: vec![],
            split_threshold: vec![],
            left_child: vec![],
            right_child: vec![],
        };
        assert_eq!(DecisionTree::from_arrays(&arrays, 1, 1).unwrap_err(), MalformedTree::Empty);
    }

    #[test]
    fn child_out_of_range_rejected() {
        let mut arrays = stump_arrays();
        arrays.right_child[0] = 7;
        assert_eq!(
            DecisionTree::from_arrays(&arrays, 2, 3).unwrap_err(),
            MalformedTree::ChildOutOfRange {
                node: 0,
                child: 7,
                n_nodes: 3,
            }
        );
    }

    #[test]
    fn cycle_rejected() {
        // Node 1 points back at node 1 via its right child.
        let arrays = TreeArrays {
            split_feature_or_label: vec![0, 0, 1],
            split_threshold: vec![1.0, 1.0, 0.0],
            left_child: vec![1, 2, 0],
            right_child: vec![2, 1, 0],
        };
        assert_eq!(
            DecisionTree::from_arrays(&arrays, 1, 2).unwrap_err(),
            MalformedTree::ChildNotAfterParent { node: 1, child: 1 }
        );
    }

    #[test]
    fn feature_and_label_ranges_checked() {
        assert_eq!(
            DecisionTree::from_arrays(&stump_arrays(), 1, 3).unwrap_err(),
            MalformedTree::FeatureOutOfRange {
                node: 0,
                feature: 1,
                n_features: 1,
            }
        );
        assert_eq!(
            DecisionTree::from_arrays(&stump_arrays(), 2, 2).unwrap_err(),
            MalformedTree::LabelOutOfRange {
                node: 2,
                label: 2,
                n_classes: 2,
            }
        );
    }
}
