//! Domain types for grove-io.

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Feature rows with integer-coded labels, as read from a training CSV.
///
/// `rows[i]` and `labels[i]` describe the same sample. Label `c` stands for
/// `class_names[c]`; class names are sorted, so codes are stable for a
/// given set of label strings.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    /// Feature column names in file order.
    pub feature_names: Vec<String>,
    /// Distinct label strings, sorted; index = class code.
    pub class_names: Vec<String>,
    /// Feature values: `rows[sample_index][feature_index]`.
    pub rows: Vec<Vec<f64>>,
    /// Class code of every row.
    pub labels: Vec<usize>,
}

impl LabeledTable {
    /// Return the number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the number of distinct classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }
}

/// Unlabeled feature rows, as read from a prediction CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    /// Feature column names, in the order values appear in each row.
    pub feature_names: Vec<String>,
    /// Feature values: `rows[sample_index][feature_index]`.
    pub rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }
}
