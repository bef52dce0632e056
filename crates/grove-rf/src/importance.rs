//! Feature importance aggregation across trees.

/// A ranked feature with name, importance score, and rank.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Importance score as computed, not normalized.
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Elementwise average of per-tree importance vectors.
///
/// Returns zeros when there are no trees.
pub(crate) fn average_importances(per_tree: &[Vec<f64>], n_features: usize) -> Vec<f64> {
    let mut totals = vec![0.0f64; n_features];
    if per_tree.is_empty() {
        return totals;
    }
    for tree_imp in per_tree {
        for (total, &val) in totals.iter_mut().zip(tree_imp) {
            *total += val;
        }
    }
    let n = per_tree.len() as f64;
    totals.iter_mut().for_each(|v| *v /= n);
    totals
}

/// Pair importances with feature names, sorted descending, with 1-based ranks.
///
/// Equal scores keep column order.
#[must_use]
pub fn rank_features(names: &[String], importances: &[f64]) -> Vec<RankedFeature> {
    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(importances)
        .map(|(name, &importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }

    features
}
