//! File I/O, validation, and serialization for the grove command line.
//!
//! Reads labeled and unlabeled CSV tables and writes JSON reports. Has no
//! dependency on the forest engine: everything crosses the boundary as
//! plain rows, names and numbers.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ExperimentName, FeatureTable, LabeledTable};
pub use error::IoError;
pub use reader::DatasetReader;
pub use writer::{ImportanceEntry, ResultWriter, TrainingReport};
