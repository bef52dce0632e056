//! JSON result writer for training reports and predictions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// One feature's score in a ranked importance list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportanceEntry {
    /// Feature name.
    pub name: String,
    /// Importance score.
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Everything the training report records.
///
/// Built from primitives so the writer has no dependency on `grove-rf`.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport<'a> {
    /// Number of trees in the forest.
    pub n_trees: usize,
    /// Number of training rows.
    pub n_samples: usize,
    /// Number of feature columns.
    pub n_features: usize,
    /// Candidate features per split.
    pub mtry: usize,
    /// Master seed the run was derived from.
    pub seed: u64,
    /// Class names; index = class code.
    pub class_names: &'a [String],
    /// OOB error, absent when no sample was ever out of bag.
    pub oob_error: Option<f64>,
    /// Rows that received at least one OOB vote.
    pub n_oob_samples: usize,
    /// OOB confusion matrix, `[true][predicted]`.
    pub confusion_matrix: Option<&'a [Vec<usize>]>,
    /// Gini importance, most important first.
    pub gini_importance: &'a [ImportanceEntry],
    /// Permutation importance, most important first, if computed.
    pub permutation_importance: Option<&'a [ImportanceEntry]>,
}

/// Writes training reports and predictions to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_report.json`,
/// `{experiment}_predictions.json` and `{experiment}_model.bin`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write the training report to `{experiment}_report.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_report(&self, report: &TrainingReport<'_>) -> Result<PathBuf, IoError> {
        let path = self.file_path("report.json");
        let artifact = ReportArtifact {
            experiment: self.experiment.as_str(),
            report,
        };
        write_json(&path, &artifact)?;
        info!(path = %path.display(), "training report written");
        Ok(path)
    }

    /// Write predictions to `{experiment}_predictions.json`.
    ///
    /// Each entry carries the row index, the class code and its name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n_rows = predictions.len()))]
    pub fn write_predictions(
        &self,
        predictions: &[usize],
        class_names: &[String],
    ) -> Result<PathBuf, IoError> {
        let path = self.file_path("predictions.json");

        let entries: Vec<PredictionEntry<'_>> = predictions
            .iter()
            .enumerate()
            .map(|(row, &class)| PredictionEntry {
                row,
                class,
                class_name: class_names.get(class).map(String::as_str),
            })
            .collect();

        let artifact = PredictArtifact {
            experiment: self.experiment.as_str(),
            n_rows: predictions.len(),
            predictions: entries,
        };

        write_json(&path, &artifact)?;
        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    /// Return the path where the model binary should be saved.
    ///
    /// Computes `{output_dir}/{experiment}_model.bin` without touching the filesystem.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.file_path("model.bin")
    }

    fn file_path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| IoError::SerializeJson {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, &json).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct ReportArtifact<'a> {
    experiment: &'a str,
    #[serde(flatten)]
    report: &'a TrainingReport<'a>,
}

#[derive(Serialize)]
struct PredictArtifact<'a> {
    experiment: &'a str,
    n_rows: usize,
    predictions: Vec<PredictionEntry<'a>>,
}

#[derive(Serialize)]
struct PredictionEntry<'a> {
    row: usize,
    class: usize,
    class_name: Option<&'a str>,
}
