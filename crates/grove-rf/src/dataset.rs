//! Validated, read-only training and query data.

use crate::error::RfError;

/// An `n × p` matrix of finite feature values.
///
/// Stored column-major (`columns[feature][sample]`) so that the split
/// search scans one contiguous column per candidate feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<Vec<f64>>,
    n_rows: usize,
}

impl FeatureMatrix {
    /// Build a matrix from row-major data: `rows[sample_idx][feature_idx]`.
    ///
    /// # Errors
    ///
    /// | Variant                           | When                               |
    /// |-----------------------------------|------------------------------------|
    /// | [`RfError::EmptyDataset`]         | `rows` is empty                    |
    /// | [`RfError::ZeroFeatures`]         | rows have zero feature columns     |
    /// | [`RfError::FeatureCountMismatch`] | rows have inconsistent lengths     |
    /// | [`RfError::NonFiniteValue`]       | any value is NaN or infinite       |
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, RfError> {
        let first = rows.first().ok_or(RfError::EmptyDataset)?;
        let n_features = first.len();
        if n_features == 0 {
            return Err(RfError::ZeroFeatures);
        }

        let mut columns = vec![Vec::with_capacity(rows.len()); n_features];
        for (sample_index, row) in rows.iter().enumerate() {
            if row.len() != n_features {
                return Err(RfError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    sample_index,
                });
            }
            for (feature_index, &val) in row.iter().enumerate() {
                if !val.is_finite() {
                    return Err(RfError::NonFiniteValue {
                        sample_index,
                        feature_index,
                    });
                }
                columns[feature_index].push(val);
            }
        }

        Ok(Self {
            columns,
            n_rows: rows.len(),
        })
    }

    /// Number of rows (samples).
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns (features).
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// Value of `feature` for `sample`.
    #[inline]
    #[must_use]
    pub fn value(&self, sample: usize, feature: usize) -> f64 {
        self.columns[feature][sample]
    }

    /// All values of one feature column.
    #[must_use]
    pub fn column(&self, feature: usize) -> &[f64] {
        &self.columns[feature]
    }
}

/// A feature matrix paired with integer class labels.
///
/// Labels are class codes in `[0, n_classes)` where `n_classes` is one
/// more than the largest observed code.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: FeatureMatrix,
    labels: Vec<usize>,
    n_classes: usize,
    feature_names: Vec<String>,
    class_names: Vec<String>,
}

impl Dataset {
    /// Pair a feature matrix with its labels.
    ///
    /// Feature names default to `f0, f1, …` and class names to the decimal
    /// class code.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::LabelCountMismatch`] when `labels.len()` differs
    /// from the number of feature rows.
    pub fn new(features: FeatureMatrix, labels: Vec<usize>) -> Result<Self, RfError> {
        if labels.len() != features.n_rows() {
            return Err(RfError::LabelCountMismatch {
                n_rows: features.n_rows(),
                n_labels: labels.len(),
            });
        }
        let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
        let feature_names = (0..features.n_features()).map(|f| format!("f{f}")).collect();
        let class_names = (0..n_classes).map(|c| c.to_string()).collect();
        Ok(Self {
            features,
            labels,
            n_classes,
            feature_names,
            class_names,
        })
    }

    /// Convenience constructor from row-major rows.
    ///
    /// # Errors
    ///
    /// Any error of [`FeatureMatrix::from_rows`] or [`Dataset::new`].
    pub fn from_rows(rows: &[Vec<f64>], labels: &[usize]) -> Result<Self, RfError> {
        Self::new(FeatureMatrix::from_rows(rows)?, labels.to_vec())
    }

    /// Replace the default feature names.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::NameCountMismatch`] unless exactly one name per column is given.
    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self, RfError> {
        if names.len() != self.features.n_features() {
            return Err(RfError::NameCountMismatch {
                what: "feature",
                expected: self.features.n_features(),
                got: names.len(),
            });
        }
        self.feature_names = names;
        Ok(self)
    }

    /// Replace the default class names.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::NameCountMismatch`] unless exactly one name per class is given.
    pub fn with_class_names(mut self, names: Vec<String>) -> Result<Self, RfError> {
        if names.len() != self.n_classes {
            return Err(RfError::NameCountMismatch {
                what: "class",
                expected: self.n_classes,
                got: names.len(),
            });
        }
        self.class_names = names;
        Ok(self)
    }

    /// The feature matrix.
    #[must_use]
    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    /// The class label of every sample.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.n_rows()
    }

    /// Number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.n_features()
    }

    /// Number of classes (largest label + 1).
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Class names indexed by class code.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_is_column_major() {
        let m = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(m.n_rows(), 3);
        assert_eq!(m.n_features(), 2);
        assert_eq!(m.column(1), &[2.0, 4.0, 6.0]);
        assert!((m.value(2, 0) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_matrix_error() {
        let err = FeatureMatrix::from_rows(&[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn zero_features_error() {
        let err = FeatureMatrix::from_rows(&[vec![], vec![]]).unwrap_err();
        assert!(matches!(err, RfError::ZeroFeatures));
    }

    #[test]
    fn ragged_rows_error() {
        let err = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(
            err,
            RfError::FeatureCountMismatch { expected: 2, got: 1, sample_index: 1 }
        ));
    }

    #[test]
    fn non_finite_error() {
        let err = FeatureMatrix::from_rows(&[vec![1.0, f64::INFINITY]]).unwrap_err();
        assert!(matches!(
            err,
            RfError::NonFiniteValue { sample_index: 0, feature_index: 1 }
        ));
    }

    #[test]
    fn label_count_mismatch() {
        let err = Dataset::from_rows(&[vec![1.0], vec![2.0]], &[0]).unwrap_err();
        assert!(matches!(err, RfError::LabelCountMismatch { n_rows: 2, n_labels: 1 }));
    }

    #[test]
    fn n_classes_and_default_names() {
        let ds = Dataset::from_rows(&[vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]], &[0, 2, 1])
            .unwrap();
        assert_eq!(ds.n_classes(), 3);
        assert_eq!(ds.feature_names(), &["f0", "f1"]);
        assert_eq!(ds.class_names(), &["0", "1", "2"]);
    }

    #[test]
    fn class_names_must_cover_every_class() {
        let ds = Dataset::from_rows(&[vec![1.0], vec![2.0]], &[0, 1]).unwrap();
        let err = ds.with_class_names(vec!["a".into()]).unwrap_err();
        assert!(matches!(err, RfError::NameCountMismatch { what: "class", .. }));
    }
}
