//! CSV dataset reader with full input validation.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{FeatureTable, LabeledTable};

/// Reads a tabular classification dataset from a CSV file.
///
/// Expected CSV format:
/// - Header row required, one name per column
/// - One column holds the class label (any string); by default the last
/// - Every other column is a numeric feature
/// - All rows must have the same number of columns as the header
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::MissingColumn`] | Label or feature column not in header |
/// | [`IoError::NoFeatureColumns`] | Only the label column is present |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Feature cell is NaN, Inf, or unparseable |
pub struct DatasetReader {
    path: PathBuf,
    label_column: Option<String>,
}

impl DatasetReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            label_column: None,
        }
    }

    /// Use the column named `name` as the label instead of the last column.
    #[must_use]
    pub fn with_label_column(mut self, name: impl Into<String>) -> Self {
        self.label_column = Some(name.into());
        self
    }

    /// Read a labeled training table.
    ///
    /// Label strings are encoded as class codes in sorted order of the
    /// distinct values, so `"cat","dog"` become `0, 1` whatever order they
    /// appear in.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<LabeledTable, IoError> {
        let (mut rdr, header) = self.open()?;

        let label_idx = match &self.label_column {
            Some(name) => self.column_index(&header, name)?,
            None => header.len().saturating_sub(1),
        };
        let feature_cols: Vec<usize> = (0..header.len()).filter(|&c| c != label_idx).collect();
        if feature_cols.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        let feature_names: Vec<String> = feature_cols.iter().map(|&c| header[c].clone()).collect();
        debug!(label = %header[label_idx], n_features = feature_names.len(), "columns resolved");

        let mut rows = Vec::new();
        let mut raw_labels = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = self.checked_record(result, row_index, header.len())?;
            rows.push(self.parse_row(&record, &feature_cols, &header, row_index)?);
            raw_labels.push(record.get(label_idx).unwrap_or_default().to_string());
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let class_names: Vec<String> = raw_labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let labels = raw_labels
            .iter()
            .map(|l| class_names.binary_search(l).unwrap_or_default())
            .collect();

        info!(
            n_samples = rows.len(),
            n_features = feature_names.len(),
            n_classes = class_names.len(),
            "labeled dataset loaded"
        );

        Ok(LabeledTable {
            feature_names,
            class_names,
            rows,
            labels,
        })
    }

    /// Read only the named feature columns, in the given order.
    ///
    /// Any other column, including a label column, is ignored.
    #[instrument(skip_all, fields(path = %self.path.display(), n_features = feature_names.len()))]
    pub fn read_features(&self, feature_names: &[String]) -> Result<FeatureTable, IoError> {
        if feature_names.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        let (mut rdr, header) = self.open()?;
        let feature_cols = feature_names
            .iter()
            .map(|name| self.column_index(&header, name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = self.checked_record(result, row_index, header.len())?;
            rows.push(self.parse_row(&record, &feature_cols, &header, row_index)?);
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(n_rows = rows.len(), "feature table loaded");

        Ok(FeatureTable {
            feature_names: feature_names.to_vec(),
            rows,
        })
    }

    fn open(&self) -> Result<(csv::Reader<File>, Vec<String>), IoError> {
        let file = File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) allows rows with varying column counts so that our own
        // InconsistentRowLength check fires instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header: Vec<String> = rdr
            .headers()
            .map_err(|e| self.csv_error(e))?
            .iter()
            .map(String::from)
            .collect();
        debug!(n_columns = header.len(), "read CSV header");
        if header.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        Ok((rdr, header))
    }

    fn column_index(&self, header: &[String], name: &str) -> Result<usize, IoError> {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| IoError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
    }

    fn checked_record(
        &self,
        result: Result<csv::StringRecord, csv::Error>,
        row_index: usize,
        expected: usize,
    ) -> Result<csv::StringRecord, IoError> {
        let record = result.map_err(|e| self.csv_error(e))?;
        if record.len() != expected {
            return Err(IoError::InconsistentRowLength {
                path: self.path.clone(),
                row_index,
                expected,
                got: record.len(),
            });
        }
        Ok(record)
    }

    fn parse_row(
        &self,
        record: &csv::StringRecord,
        columns: &[usize],
        header: &[String],
        row_index: usize,
    ) -> Result<Vec<f64>, IoError> {
        columns
            .iter()
            .map(|&col| {
                let raw = record.get(col).unwrap_or_default();
                match raw.parse::<f64>() {
                    Ok(value) if value.is_finite() => Ok(value),
                    _ => Err(IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        column: header[col].clone(),
                        raw: raw.to_string(),
                    }),
                }
            })
            .collect()
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
