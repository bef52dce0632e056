use rand::Rng;
use rand::seq::SliceRandom;

use crate::dataset::{Dataset, FeatureMatrix};
use crate::error::MalformedTree;
use crate::node::{FeatureIndex, Node, NodeIndex};
use crate::predict::majority_vote;
use crate::split::{class_counts, find_best_split, sum_sq_ratio};

/// A fitted classification tree.
///
/// Stored as an arena-based `Vec<Node>` with index references. Index 0 is
/// the root, and every child index is strictly greater than its parent's,
/// which bounds any root-to-leaf walk by the number of nodes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
}

/// Output of growing one tree: the arena and the Gini importance it earned.
#[derive(Debug, Clone)]
pub struct Growth {
    /// The grown tree.
    pub tree: DecisionTree,
    /// Per-feature sum of impurity reductions over the tree's winning splits.
    pub gini_importance: Vec<f64>,
}

/// Mutable state that only exists while a tree is being grown.
struct TreeGrower<'a> {
    features: &'a FeatureMatrix,
    labels: &'a [usize],
    n_classes: usize,
    mtry: usize,
    nodes: Vec<Node>,
    /// Samples assigned to each node not yet split; emptied once processed.
    samples: Vec<Vec<usize>>,
    gini_importance: Vec<f64>,
}

/// Grow a tree from the in-bag samples of `dataset`.
///
/// Nodes are processed in arena order by a cursor that trails the end of
/// the arena; each split appends its two children, so the walk is
/// breadth-first and stops once every node is a leaf.
pub fn grow(dataset: &Dataset, in_bag: &[usize], mtry: usize, rng: &mut impl Rng) -> Growth {
    let mut grower = TreeGrower {
        features: dataset.features(),
        labels: dataset.labels(),
        n_classes: dataset.n_classes(),
        mtry,
        nodes: Vec::new(),
        samples: Vec::new(),
        gini_importance: vec![0.0; dataset.n_features()],
    };

    grower.create_node(in_bag.to_vec());
    let mut cursor = 0;
    while cursor < grower.nodes.len() {
        grower.split_node(cursor, rng);
        cursor += 1;
    }

    Growth {
        tree: DecisionTree {
            nodes: grower.nodes,
        },
        gini_importance: grower.gini_importance,
    }
}

impl TreeGrower<'_> {
    /// Append a placeholder node owning `samples`, returning its index.
    fn create_node(&mut self, samples: Vec<usize>) -> NodeIndex {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { prediction: 0 });
        self.samples.push(samples);
        NodeIndex::new(idx)
    }

    fn split_node(&mut self, idx: usize, rng: &mut impl Rng) {
        let samples = std::mem::take(&mut self.samples[idx]);
        let counts = class_counts(self.labels, &samples, self.n_classes);

        // Pure (or empty) node.
        if counts.iter().filter(|&&c| c > 0).count() <= 1 {
            self.nodes[idx] = Node::Leaf {
                prediction: majority_vote(&counts),
            };
            return;
        }

        let Some(best) = find_best_split(
            self.features,
            self.labels,
            &samples,
            &counts,
            self.mtry,
            rng,
        ) else {
            self.nodes[idx] = Node::Leaf {
                prediction: majority_vote(&counts),
            };
            return;
        };

        let column = self.features.column(best.feature.index());
        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&si| column[si] < best.threshold);

        let left = self.create_node(left_samples);
        let right = self.create_node(right_samples);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };

        // A zero-gain split can round to a tiny negative contribution.
        self.gini_importance[best.feature.index()] +=
            (best.score - sum_sq_ratio(&counts, samples.len())).max(0.0);
    }
}

impl DecisionTree {
    /// Walk from the root to a leaf and return its class.
    ///
    /// `value` supplies the feature value consulted at each split. Every
    /// step is bound-checked, so a corrupt arena yields an error instead of
    /// an out-of-range access. Each step moves to a strictly larger index
    /// below `n_nodes`, so the walk ends within `n_nodes` steps.
    pub(crate) fn traverse(
        &self,
        value: impl Fn(FeatureIndex) -> f64,
    ) -> Result<usize, MalformedTree> {
        let n_nodes = self.nodes.len();
        if n_nodes == 0 {
            return Err(MalformedTree::Empty);
        }

        let mut idx = NodeIndex::ROOT.index();
        loop {
            match &self.nodes[idx] {
                Node::Leaf { prediction } => return Ok(*prediction),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let next = if value(*feature) < *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                    if next >= n_nodes {
                        return Err(MalformedTree::ChildOutOfRange {
                            node: idx,
                            child: next,
                            n_nodes,
                        });
                    }
                    if next <= idx {
                        return Err(MalformedTree::ChildNotAfterParent {
                            node: idx,
                            child: next,
                        });
                    }
                    idx = next;
                }
            }
        }
    }

    /// Predict the class of row `sample` of `features`.
    pub(crate) fn predict_sample(
        &self,
        features: &FeatureMatrix,
        sample: usize,
    ) -> Result<usize, MalformedTree> {
        self.traverse(|f| features.value(sample, f.index()))
    }

    /// Predict the class of a row-major sample whose width was already checked.
    pub(crate) fn predict_row(&self, row: &[f64]) -> Result<usize, MalformedTree> {
        self.traverse(|f| row[f.index()])
    }

    /// Misclassification rate of this tree over its out-of-bag samples.
    ///
    /// Returns `None` for an empty out-of-bag set.
    pub fn oob_error(&self, dataset: &Dataset, out_of_bag: &[usize]) -> Result<Option<f64>, MalformedTree> {
        if out_of_bag.is_empty() {
            return Ok(None);
        }
        let labels = dataset.labels();
        let mut errors = 0usize;
        for &si in out_of_bag {
            if self.predict_sample(dataset.features(), si)? != labels[si] {
                errors += 1;
            }
        }
        Ok(Some(errors as f64 / out_of_bag.len() as f64))
    }

    /// Per-feature increase in out-of-bag error when that feature is permuted.
    ///
    /// For each feature, the out-of-bag samples are paired with a shuffled
    /// copy of themselves; while predicting sample `oob[i]`, every split on
    /// that feature reads the value of `permuted[i]` instead. Both error rates
    /// are relative to the out-of-bag set size. Returns `None` for an empty
    /// out-of-bag set.
    pub fn permutation_importance(
        &self,
        dataset: &Dataset,
        out_of_bag: &[usize],
        rng: &mut impl Rng,
    ) -> Result<Option<Vec<f64>>, MalformedTree> {
        let Some(baseline) = self.oob_error(dataset, out_of_bag)? else {
            return Ok(None);
        };

        let features = dataset.features();
        let labels = dataset.labels();
        let n_oob = out_of_bag.len() as f64;
        let mut permuted = out_of_bag.to_vec();
        let mut importance = Vec::with_capacity(dataset.n_features());

        for feat_idx in 0..dataset.n_features() {
            permuted.shuffle(rng);
            let mut errors = 0usize;
            for (&si, &donor) in out_of_bag.iter().zip(&permuted) {
                let pred = self.traverse(|f| {
                    let source = if f.index() == feat_idx { donor } else { si };
                    features.value(source, f.index())
                })?;
                if pred != labels[si] {
                    errors += 1;
                }
            }
            importance.push(errors as f64 / n_oob - baseline);
        }

        Ok(Some(importance))
    }

    /// Borrow the node arena.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        // Children always follow their parent, so one forward pass suffices.
        let mut depths = vec![0usize; self.nodes.len()];
        let mut max_depth = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            max_depth = max_depth.max(depths[idx]);
            if let Node::Split { left, right, .. } = node {
                let child_depth = depths[idx] + 1;
                for child in [left.index(), right.index()] {
                    if let Some(d) = depths.get_mut(child) {
                        *d = child_depth;
                    }
                }
            }
        }
        max_depth
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn grow_all(dataset: &Dataset, mtry: usize, seed: u64) -> Growth {
        let in_bag: Vec<usize> = (0..dataset.n_samples()).collect();
        grow(dataset, &in_bag, mtry, &mut ChaCha8Rng::seed_from_u64(seed))
    }

    fn separable() -> Dataset {
        Dataset::from_rows(
            &[
                vec![0.0],
                vec![1.0],
                vec![2.0],
                vec![10.0],
                vec![11.0],
                vec![12.0],
            ],
            &[0, 0, 0, 1, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn pure_dataset_single_leaf() {
        let ds = Dataset::from_rows(
            &[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
            &[2, 2, 2],
        )
        .unwrap();
        for mtry in 1..=2 {
            let growth = grow_all(&ds, mtry, 7);
            assert_eq!(growth.tree.n_nodes(), 1);
            assert_eq!(growth.tree.nodes()[0], Node::Leaf { prediction: 2 });
            assert!(growth.gini_importance.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn linearly_separable_zero_training_error() {
        let ds = separable();
        let growth = grow_all(&ds, 1, 42);
        let tree = &growth.tree;
        for i in 0..ds.n_samples() {
            assert_eq!(tree.predict_sample(ds.features(), i).unwrap(), ds.labels()[i]);
        }
        match &tree.nodes()[0] {
            Node::Split { threshold, .. } => assert!(*threshold > 2.0 && *threshold <= 10.0),
            Node::Leaf { .. } => panic!("root should split"),
        }
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn gini_importance_of_root_split() {
        // Parent [3, 3] over 6 samples: 18/6 = 3. Pure halves score 6.
        let growth = grow_all(&separable(), 1, 42);
        assert!((growth.gini_importance[0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn children_follow_parents() {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i * 7 % 13) as f64, (i * 3 % 11) as f64, i as f64])
            .collect();
        let labels: Vec<usize> = (0..40).map(|i| (i * 5 % 7) % 3).collect();
        let ds = Dataset::from_rows(&rows, &labels).unwrap();
        let growth = grow_all(&ds, 2, 3);
        for (idx, node) in growth.tree.nodes().iter().enumerate() {
            if let Node::Split { left, right, .. } = node {
                assert!(left.index() > idx);
                assert!(right.index() > idx);
            }
        }
        assert_eq!(growth.tree.n_leaves(), (growth.tree.n_nodes() + 1) / 2);
        assert!(growth.gini_importance.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn zero_gain_split_never_lowers_importance() {
        // Both sides keep the parent's 1:5 class ratio, so the split gains nothing.
        let mut rows = vec![vec![0.0]; 6];
        rows.extend(vec![vec![1.0]; 24]);
        let mut labels = vec![0, 1, 1, 1, 1, 1];
        labels.extend(std::iter::repeat_n(0, 4));
        labels.extend(std::iter::repeat_n(1, 20));
        let ds = Dataset::from_rows(&rows, &labels).unwrap();

        let growth = grow_all(&ds, 1, 0);
        assert_eq!(growth.tree.n_nodes(), 3);
        assert!(growth.gini_importance[0] >= 0.0, "{:?}", growth.gini_importance);
        assert!(growth.gini_importance[0] < 1e-9);
    }

    #[test]
    fn inseparable_duplicates_become_majority_leaf() {
        // Identical feature values with mixed labels: no usable split.
        let ds = Dataset::from_rows(&[vec![1.0], vec![1.0], vec![1.0]], &[1, 0, 1]).unwrap();
        let growth = grow_all(&ds, 1, 0);
        assert_eq!(growth.tree.nodes(), &[Node::Leaf { prediction: 1 }]);
    }

    #[test]
    fn majority_leaf_ties_go_to_lowest_class() {
        let ds = Dataset::from_rows(&[vec![4.0], vec![4.0]], &[1, 0]).unwrap();
        let growth = grow_all(&ds, 1, 0);
        assert_eq!(growth.tree.nodes(), &[Node::Leaf { prediction: 0 }]);
    }

    #[test]
    fn xor_needs_depth_at_least_2() {
        let ds = Dataset::from_rows(
            &[vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
            &[0, 1, 1, 0],
        )
        .unwrap();
        let growth = grow_all(&ds, 2, 42);
        assert!(growth.tree.depth() >= 2);
        for i in 0..4 {
            assert_eq!(growth.tree.predict_sample(ds.features(), i).unwrap(), ds.labels()[i]);
        }
    }

    #[test]
    fn deterministic_with_same_seed() {
        let ds = separable();
        assert_eq!(grow_all(&ds, 1, 123).tree, grow_all(&ds, 1, 123).tree);
    }

    #[test]
    fn traversal_rejects_backward_child() {
        let tree = DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: FeatureIndex::new(0),
                    threshold: 1.0,
                    left: NodeIndex::new(1),
                    right: NodeIndex::new(2),
                },
                Node::Split {
                    feature: FeatureIndex::new(0),
                    threshold: 1.0,
                    left: NodeIndex::new(0),
                    right: NodeIndex::new(0),
                },
                Node::Leaf { prediction: 0 },
            ],
        };
        let err = tree.predict_row(&[0.0]).unwrap_err();
        assert_eq!(err, MalformedTree::ChildNotAfterParent { node: 1, child: 0 });
        assert_eq!(tree.predict_row(&[5.0]).unwrap(), 0);
    }

    #[test]
    fn traversal_rejects_out_of_range_child() {
        let tree = DecisionTree {
            nodes: vec![Node::Split {
                feature: FeatureIndex::new(0),
                threshold: 0.0,
                left: NodeIndex::new(5),
                right: NodeIndex::new(6),
            }],
        };
        assert!(matches!(
            tree.predict_row(&[1.0]).unwrap_err(),
            MalformedTree::ChildOutOfRange { node: 0, child: 6, n_nodes: 1 }
        ));
    }

    #[test]
    fn empty_tree_traversal_error() {
        let tree = DecisionTree { nodes: vec![] };
        assert_eq!(tree.predict_row(&[1.0]).unwrap_err(), MalformedTree::Empty);
    }

    #[test]
    fn oob_error_on_empty_set_is_none() {
        let ds = separable();
        let growth = grow_all(&ds, 1, 1);
        assert_eq!(growth.tree.oob_error(&ds, &[]).unwrap(), None);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(growth.tree.permutation_importance(&ds, &[], &mut rng).unwrap(), None);
    }

    #[test]
    fn permuting_the_split_feature_hurts() {
        // Tree trained on the first half, evaluated on a held-out copy of the
        // pattern: feature 0 decides the class, feature 1 is constant.
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let class = i % 2;
            rows.push(vec![class as f64 * 10.0 + (i / 2) as f64 * 0.1, 1.0]);
            labels.push(class);
        }
        let ds = Dataset::from_rows(&rows, &labels).unwrap();
        let in_bag: Vec<usize> = (0..20).collect();
        let oob: Vec<usize> = (20..40).collect();
        let growth = grow(&ds, &in_bag, 2, &mut ChaCha8Rng::seed_from_u64(4));

        assert_eq!(growth.tree.oob_error(&ds, &oob).unwrap(), Some(0.0));

        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let imp = growth
            .tree
            .permutation_importance(&ds, &oob, &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(imp.len(), 2);
        assert!(imp[0] > 0.1, "informative importance = {}", imp[0]);
        assert!(imp[1].abs() < f64::EPSILON, "unused feature importance = {}", imp[1]);
    }
}
