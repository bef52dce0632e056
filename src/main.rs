use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use grove_io::{DatasetReader, ExperimentName, ImportanceEntry, ResultWriter, TrainingReport};
use grove_rf::{
    Dataset, FeatureMatrix, ForestConfig, MaxFeatures, Model, PermutationMode, RankedFeature,
    rank_features,
};

#[derive(Parser)]
#[command(name = "grove")]
#[command(about = "Random forest classification for tabular CSV data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of worker threads (0 or unset = all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Forest hyperparameters.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees in the forest
    #[arg(long, default_value_t = 500)]
    n_trees: usize,

    /// Candidate features per split; overrides --max-features
    #[arg(long)]
    mtry: Option<usize>,

    /// Candidate feature strategy: "sqrt", "log2", "all", or a fraction in (0, 1]
    #[arg(long, default_value = "sqrt")]
    max_features: String,

    /// Draw bootstrap samples without replacement
    #[arg(long, default_value_t = false)]
    no_replace: bool,

    /// Fraction of rows drawn into each tree's bootstrap sample
    #[arg(long, default_value_t = 1.0)]
    sample_fraction: f64,

    /// Also compute permutation importance (slower)
    #[arg(long, default_value_t = false)]
    permutation_importance: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Train a random forest and write the model and a report
    Train {
        /// Path to the training CSV file
        #[arg(long)]
        data: PathBuf,

        /// Name of the label column (defaults to the last column)
        #[arg(long)]
        label_column: Option<String>,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Classify the rows of a CSV file with a trained model
    Predict {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to the CSV file to classify
        #[arg(long)]
        data: PathBuf,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    experiment: String,
    n_samples: usize,
    n_features: usize,
    n_classes: usize,
    n_trees: usize,
    mtry: usize,
    oob_error: Option<f64>,
    oob_accuracy: Option<f64>,
    model_path: PathBuf,
    report_path: PathBuf,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_rows: usize,
    model_n_trees: usize,
    model_n_features: usize,
    model_n_classes: usize,
    class_counts: BTreeMap<String, usize>,
    predictions_path: PathBuf,
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "log2" => Ok(MaxFeatures::Log2),
        "all" => Ok(MaxFeatures::All),
        other => {
            let fraction: f64 = other.parse().with_context(|| {
                format!("unknown max-features: {other} (expected sqrt, log2, all, or a fraction)")
            })?;
            if !(fraction > 0.0 && fraction <= 1.0) {
                anyhow::bail!("max-features fraction must be in (0, 1], got {fraction}");
            }
            Ok(MaxFeatures::Fraction(fraction))
        }
    }
}

/// Resolve `--threads`: unset or 0 means every core rayon sees.
fn resolve_threads(threads: Option<usize>) -> usize {
    match threads {
        Some(n) if n > 0 => n,
        _ => rayon::current_num_threads(),
    }
}

fn importance_entries(ranked: Vec<RankedFeature>) -> Vec<ImportanceEntry> {
    ranked
        .into_iter()
        .map(|f| ImportanceEntry {
            name: f.name,
            importance: f.importance,
            rank: f.rank,
        })
        .collect()
}

/// Number of rows predicted as each class, keyed by class name.
fn class_counts(model: &Model, predictions: &[usize]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for &code in predictions {
        *counts.entry(model.class_name(code)).or_insert(0) += 1;
    }
    counts
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let num_threads = resolve_threads(cli.threads);
    info!(num_threads, "worker threads resolved");

    match cli.command {
        Command::Train {
            data,
            label_column,
            experiment,
            output_dir,
            forest,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Read labeled CSV
            let mut reader = DatasetReader::new(&data);
            if let Some(label) = label_column {
                reader = reader.with_label_column(label);
            }
            let table = reader.read().context("failed to read training CSV")?;

            let dataset = Dataset::from_rows(&table.rows, &table.labels)
                .context("invalid training data")?
                .with_feature_names(table.feature_names.clone())?
                .with_class_names(table.class_names.clone())?;

            // 2. Configure and train
            let max_features = match forest.mtry {
                Some(mtry) => MaxFeatures::Fixed(mtry),
                None => parse_max_features(&forest.max_features)?,
            };
            let permutation_mode = if forest.permutation_importance {
                PermutationMode::Enabled
            } else {
                PermutationMode::Disabled
            };
            let config = ForestConfig::new(forest.n_trees)?
                .with_max_features(max_features)
                .with_replace(!forest.no_replace)
                .with_sample_fraction(forest.sample_fraction)
                .with_num_threads(num_threads)
                .with_seed(cli.seed)
                .with_permutation_mode(permutation_mode);

            let result = config.fit(&dataset).context("training failed")?;
            let oob_error = result.oob_score().map(|s| s.error);

            // 3. Save model
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let model = Model::from_training(&result);
            let model_path = writer.model_path();
            model.save(&model_path).context("failed to save model")?;

            // 4. Write report
            let gini = importance_entries(rank_features(
                dataset.feature_names(),
                result.gini_importance(),
            ));
            let permutation = result
                .permutation_importance()
                .map(|p| importance_entries(rank_features(dataset.feature_names(), &p.mean)));
            let metadata = result.metadata();
            let report = TrainingReport {
                n_trees: metadata.num_trees,
                n_samples: metadata.n_samples,
                n_features: metadata.n_features,
                mtry: metadata.mtry,
                seed: cli.seed,
                class_names: dataset.class_names(),
                oob_error,
                n_oob_samples: result.oob_score().map_or(0, |s| s.n_oob_samples),
                confusion_matrix: result.oob_score().map(|s| s.confusion_matrix.as_slice()),
                gini_importance: &gini,
                permutation_importance: permutation.as_deref(),
            };
            let report_path = writer.write_report(&report)?;

            // 5. Print summary
            let output = TrainOutput {
                experiment,
                n_samples: metadata.n_samples,
                n_features: metadata.n_features,
                n_classes: metadata.n_classes,
                n_trees: metadata.num_trees,
                mtry: metadata.mtry,
                oob_error,
                oob_accuracy: result.oob_score().map(|s| s.accuracy()),
                model_path,
                report_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            data,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Load model
            let model = Model::load(&model).context("failed to load model")?;
            info!(
                n_trees = model.trees.len(),
                n_features = model.n_features,
                n_classes = model.n_classes,
                "model loaded"
            );

            // 2. Read the model's feature columns
            let table = DatasetReader::new(&data)
                .read_features(&model.feature_names)
                .context("failed to read prediction CSV")?;
            let features = FeatureMatrix::from_rows(&table.rows).context("invalid prediction data")?;

            // 3. Predict
            let predictions =
                grove_rf::predict(&model, &features, num_threads).context("prediction failed")?;

            // 4. Write predictions JSON
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let predictions_path = writer.write_predictions(&predictions, &model.class_names)?;

            // 5. Print summary
            let output = PredictOutput {
                experiment,
                n_rows: predictions.len(),
                model_n_trees: model.trees.len(),
                model_n_features: model.n_features,
                model_n_classes: model.n_classes,
                class_counts: class_counts(&model, &predictions),
                predictions_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
