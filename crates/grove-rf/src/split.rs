//! Candidate feature selection and threshold search for a single node.

use rand::Rng;

use crate::dataset::FeatureMatrix;
use crate::node::FeatureIndex;

/// Count the samples of each class among `samples`.
pub(crate) fn class_counts(labels: &[usize], samples: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &si in samples {
        counts[labels[si]] += 1;
    }
    counts
}

/// `Σ count² / n`, the per-partition term of the split score.
///
/// Larger is purer: `1 - sum_sq_ratio / n` is the Gini impurity.
pub(crate) fn sum_sq_ratio(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let sum_sq: f64 = counts.iter().map(|&c| (c * c) as f64).sum();
    sum_sq / n as f64
}

/// Best split found for a node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SplitCandidate {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Samples with `value < threshold` go left.
    pub(crate) threshold: f64,
    /// `sum_sq_ratio(left) + sum_sq_ratio(right)`.
    pub(crate) score: f64,
}

/// Choose `mtry` distinct features uniformly from `0..n_features`.
///
/// Partial Fisher-Yates: only the first `mtry` positions are shuffled.
pub(crate) fn sample_features(n_features: usize, mtry: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n_features).collect();
    let take = mtry.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        order.swap(i, j);
    }
    order.truncate(take);
    order
}

/// Find the best split among `mtry` randomly chosen features.
///
/// Every distinct value a candidate feature takes among `samples` is tried
/// as a threshold `t`, partitioning into `value < t` and `value >= t`.
/// Thresholds leaving either side empty are skipped. The split maximising
/// `sum_sq_ratio(left) + sum_sq_ratio(right)` wins; ties keep the first one
/// seen (features in sampled order, thresholds ascending).
///
/// Returns `None` when no candidate threshold separates the samples.
pub(crate) fn find_best_split(
    features: &FeatureMatrix,
    labels: &[usize],
    samples: &[usize],
    parent_counts: &[usize],
    mtry: usize,
    rng: &mut impl Rng,
) -> Option<SplitCandidate> {
    let n_samples = samples.len();
    if n_samples < 2 {
        return None;
    }
    let n_classes = parent_counts.len();

    let mut best: Option<SplitCandidate> = None;

    for feat_idx in sample_features(features.n_features(), mtry, rng) {
        let column = features.column(feat_idx);

        let mut sorted: Vec<(f64, usize)> = samples
            .iter()
            .map(|&si| (column[si], labels[si]))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        // Left holds every sample strictly below the current value.
        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = parent_counts.to_vec();

        for i in 0..n_samples {
            let (value, class) = sorted[i];
            if i > 0 && value > sorted[i - 1].0 {
                let score = sum_sq_ratio(&left_counts, i) + sum_sq_ratio(&right_counts, n_samples - i);
                if score > 0.0 && best.as_ref().is_none_or(|b| score > b.score) {
                    best = Some(SplitCandidate {
                        feature: FeatureIndex::new(feat_idx),
                        threshold: value,
                        score,
                    });
                }
            }
            left_counts[class] += 1;
            right_counts[class] -= 1;
        }
    }

    best
}
