use std::path::PathBuf;

/// Errors from Random Forest operations.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when num_trees is zero.
    #[error("num_trees must be at least 1, got {num_trees}")]
    InvalidTreeCount {
        /// The invalid num_trees value provided.
        num_trees: usize,
    },

    /// Returned when mtry resolves to 0 or exceeds n_features.
    #[error("mtry resolved to {mtry}, but must be in [1, {n_features}]")]
    InvalidMtry {
        /// The resolved mtry value.
        mtry: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when sample_fraction is not in (0.0, 1.0].
    #[error("sample_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidSampleFraction {
        /// The invalid sample_fraction value provided.
        fraction: f64,
    },

    /// Returned when floor(n_samples * sample_fraction) is zero.
    #[error("bootstrap sample is empty: {n_samples} samples at sample_fraction {fraction}")]
    EmptyBootstrap {
        /// Number of training samples.
        n_samples: usize,
        /// The configured sample_fraction.
        fraction: f64,
    },

    /// Returned when num_threads is zero (the host resolves "all cores").
    #[error("num_threads must be at least 1, got {num_threads}")]
    InvalidThreadCount {
        /// The invalid num_threads value provided.
        num_threads: usize,
    },

    /// Returned when the feature matrix has zero rows.
    #[error("feature matrix has zero rows")]
    EmptyDataset,

    /// Returned when the feature matrix has zero columns.
    #[error("feature matrix has zero feature columns")]
    ZeroFeatures,

    /// Returned when a row has a different number of features than the first row.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when the label vector length differs from the feature row count.
    #[error("feature matrix has {n_rows} rows but label vector has {n_labels} entries")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_rows: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a dataset passed after training has a different row
    /// count than the one the forest was trained on.
    #[error("forest was trained on {expected} rows, got a dataset with {got}")]
    TrainingDataMismatch {
        /// Training row count.
        expected: usize,
        /// Row count of the dataset supplied.
        got: usize,
    },

    /// Returned when a names vector does not match the dimension it names.
    #[error("expected {expected} {what} names, got {got}")]
    NameCountMismatch {
        /// Which names ("feature" or "class").
        what: &'static str,
        /// Required number of names.
        expected: usize,
        /// Number of names supplied.
        got: usize,
    },

    /// Returned when prediction input has a different width than the model.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The number of features the model was trained on.
        expected: usize,
        /// The number of features in the prediction input.
        got: usize,
    },

    /// Returned when a tree's node arrays violate the arena invariants.
    #[error("malformed model: tree {tree}")]
    MalformedModel {
        /// Zero-based index of the offending tree.
        tree: usize,
        /// What was wrong with it.
        source: MalformedTree,
    },

    /// Returned when the worker pool cannot be created.
    #[error("failed to build worker pool with {num_threads} threads")]
    ThreadPool {
        /// Requested worker count.
        num_threads: usize,
        /// The underlying rayon error.
        source: rayon::ThreadPoolBuildError,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },
}

/// Ways a node arena can violate its structural invariants.
///
/// Raised when restoring a tree from [`TreeArrays`](crate::TreeArrays) and,
/// as a last line of defence, during traversal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedTree {
    /// The tree has no nodes at all.
    #[error("tree has no nodes")]
    Empty,

    /// The four parallel node arrays have different lengths.
    #[error(
        "node arrays differ in length: split_feature_or_label={features}, \
         split_threshold={thresholds}, left_child={lefts}, right_child={rights}"
    )]
    LengthMismatch {
        /// Length of `split_feature_or_label`.
        features: usize,
        /// Length of `split_threshold`.
        thresholds: usize,
        /// Length of `left_child`.
        lefts: usize,
        /// Length of `right_child`.
        rights: usize,
    },

    /// A child index points past the end of the arena.
    #[error("node {node} has child {child}, but the tree has only {n_nodes} nodes")]
    ChildOutOfRange {
        /// The parent node.
        node: usize,
        /// The offending child index.
        child: usize,
        /// Arena size.
        n_nodes: usize,
    },

    /// A child index is not strictly greater than its parent's index.
    #[error("node {node} has child {child}, children must come after their parent")]
    ChildNotAfterParent {
        /// The parent node.
        node: usize,
        /// The offending child index.
        child: usize,
    },

    /// A split refers to a feature column the model does not have.
    #[error("node {node} splits on feature {feature}, but the model has {n_features} features")]
    FeatureOutOfRange {
        /// The split node.
        node: usize,
        /// The offending feature index.
        feature: usize,
        /// Number of features in the model.
        n_features: usize,
    },

    /// A leaf predicts a class code the model does not have.
    #[error("leaf {node} predicts class {label}, but the model has {n_classes} classes")]
    LabelOutOfRange {
        /// The leaf node.
        node: usize,
        /// The offending class code.
        label: usize,
        /// Number of classes in the model.
        n_classes: usize,
    },
}
