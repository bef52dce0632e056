//! Accuracy and reproducibility regression tests for grove-rf.
//!
//! These tests verify that algorithmic changes do not degrade classification
//! accuracy on a deterministic synthetic dataset, and that training stays
//! reproducible for a fixed seed.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use grove_rf::{
    Bootstrap, Dataset, ForestConfig, Model, Node, PermutationMode, RandomForest, grow,
    rank_features, tree_seeds,
};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic classification dataset
// ---------------------------------------------------------------------------

/// Generate a 300-sample, 10-feature, 3-class classification dataset.
///
/// Features 0-2 are informative (class * 3.0 + noise in [0, 0.5]).
/// Features 3-9 are pure noise in [0, 0.5].
/// Samples are assigned round-robin across classes.
fn make_classification() -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let n_samples = 300;
    let n_features = 10;
    let n_classes = 3;

    let mut rows = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % n_classes;
        labels.push(class);
        let row: Vec<f64> = (0..n_features)
            .map(|f| {
                let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
                base + rng.r#gen::<f64>() * 0.5
            })
            .collect();
        rows.push(row);
    }
    Dataset::from_rows(&rows, &labels).unwrap()
}

fn accuracy(predictions: &[usize], labels: &[usize]) -> f64 {
    let correct = predictions
        .iter()
        .zip(labels)
        .filter(|&(&p, &l)| p == l)
        .count();
    correct as f64 / labels.len() as f64
}

// ---------------------------------------------------------------------------
// a) oob_error_below_threshold
// ---------------------------------------------------------------------------

/// OOB error with 100 trees must stay below 0.20.
#[test]
fn oob_error_below_threshold() {
    let ds = make_classification();
    let result = ForestConfig::new(100)
        .unwrap()
        .with_seed(42)
        .with_num_threads(4)
        .fit(&ds)
        .unwrap();

    let oob = result.oob_score().expect("bootstrap with replacement leaves OOB samples");
    assert!(oob.error < 0.20, "oob_error {} >= 0.20", oob.error);
    assert_eq!(oob.n_oob_samples, ds.n_samples());
    let total: usize = oob.confusion_matrix.iter().flatten().sum();
    assert_eq!(total, oob.n_oob_samples);
}

// ---------------------------------------------------------------------------
// b) top_features_are_informative
// ---------------------------------------------------------------------------

/// The top 3 features by Gini importance must include at least 2 of f0, f1, f2.
#[test]
fn top_features_are_informative() {
    let ds = make_classification();
    let result = ForestConfig::new(100).unwrap().with_seed(42).fit(&ds).unwrap();

    let ranked = rank_features(result.feature_names(), result.gini_importance());
    let informative = ["f0", "f1", "f2"];
    let informative_in_top3 = ranked
        .iter()
        .take(3)
        .filter(|f| informative.contains(&f.name.as_str()))
        .count();

    assert!(
        informative_in_top3 >= 2,
        "only {informative_in_top3}/3 of top-3 features are informative; ranking: {ranked:?}"
    );
}

// ---------------------------------------------------------------------------
// c) permutation importance favours signal
// ---------------------------------------------------------------------------

/// Mean permutation importance of the informative block must exceed the noise block.
#[test]
fn permutation_importance_favours_informative_features() {
    let ds = make_classification();
    let result = ForestConfig::new(60)
        .unwrap()
        .with_seed(7)
        .with_num_threads(3)
        .with_permutation_mode(PermutationMode::Enabled)
        .fit(&ds)
        .unwrap();

    let perm = result.permutation_importance().unwrap();
    let signal: f64 = perm.mean[..3].iter().sum::<f64>() / 3.0;
    let noise: f64 = perm.mean[3..].iter().sum::<f64>() / 7.0;
    assert!(signal > noise, "signal {signal} <= noise {noise}");
}

// ---------------------------------------------------------------------------
// d) determinism
// ---------------------------------------------------------------------------

/// Same seed and thread count produce bit-identical trees and statistics.
#[test]
fn deterministic_training() {
    let ds = make_classification();
    let config = ForestConfig::new(40).unwrap().with_seed(42).with_num_threads(3);

    let a = config.fit(&ds).unwrap();
    let b = config.fit(&ds).unwrap();

    assert_eq!(a.forest(), b.forest());
    assert_eq!(a.gini_importance(), b.gini_importance());
    assert_eq!(a.oob_score(), b.oob_score());
    assert_eq!(a.tree_seeds(), tree_seeds(42, 40).as_slice());
}

/// Growing the trees one by one in reverse slot order reproduces the forest.
#[test]
fn trees_regrow_independently_in_any_order() {
    let ds = make_classification();
    let result = ForestConfig::new(12)
        .unwrap()
        .with_seed(5)
        .with_num_threads(2)
        .fit(&ds)
        .unwrap();
    let mtry = result.metadata().mtry;

    for slot in (0..12).rev() {
        let tree_seed = result.tree_seeds()[slot];
        let mut rng = ChaCha8Rng::seed_from_u64(tree_seed);
        rng.set_stream(0);
        let bootstrap = Bootstrap::draw(ds.n_samples(), ds.n_samples(), true, &mut rng);
        assert_eq!(&bootstrap, &result.bootstraps()[slot]);
        let growth = grow(&ds, bootstrap.in_bag(), mtry, &mut rng);
        assert_eq!(&growth.tree, &result.forest().trees()[slot]);
    }
}

// ---------------------------------------------------------------------------
// e) prediction accuracy and model round trip
// ---------------------------------------------------------------------------

/// Training accuracy with 100 trees must exceed 0.95.
#[test]
fn prediction_accuracy_on_training_data() {
    let ds = make_classification();
    let model = grove_rf::train(&ds, &ForestConfig::new(100).unwrap().with_seed(42)).unwrap();
    let predictions = grove_rf::predict(&model, ds.features(), 4).unwrap();
    let acc = accuracy(&predictions, ds.labels());
    assert!(acc > 0.95, "training accuracy {acc} <= 0.95");
}

/// A model saved to disk predicts exactly like the forest it came from.
#[test]
fn saved_model_predicts_like_trained_forest() {
    let ds = make_classification();
    let result = ForestConfig::new(25).unwrap().with_seed(11).fit(&ds).unwrap();
    let model = Model::from_training(&result);

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("forest.bin");
    model.save(&path).unwrap();
    let loaded = Model::load(&path).unwrap();

    let direct = result.forest().predict_batch(ds.features(), 1).unwrap();
    let restored = grove_rf::predict(&loaded, ds.features(), 2).unwrap();
    assert_eq!(direct, restored);

    let forest = RandomForest::init(&loaded.trees, loaded.n_features, loaded.n_classes).unwrap();
    assert_eq!(&forest, result.forest());
}

// ---------------------------------------------------------------------------
// f) degenerate inputs
// ---------------------------------------------------------------------------

/// A single-class dataset yields root-only trees predicting that class.
#[test]
fn single_class_dataset() {
    let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (20 - i) as f64]).collect();
    let ds = Dataset::from_rows(&rows, &[0; 20]).unwrap();
    for mtry in 1..=2 {
        let result = ForestConfig::new(4).unwrap().with_mtry(mtry).fit(&ds).unwrap();
        for tree in result.forest().trees() {
            assert_eq!(tree.nodes(), &[Node::Leaf { prediction: 0 }]);
        }
    }
}

/// The separable reference case: no replacement, full sample, zero error.
#[test]
fn separable_reference_case() {
    let ds = Dataset::from_rows(
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
    .unwrap();
    let result = ForestConfig::new(3)
        .unwrap()
        .with_mtry(1)
        .with_replace(false)
        .with_sample_fraction(1.0)
        .fit(&ds)
        .unwrap();

    assert!(result.oob_score().is_none());
    let predictions = result.forest().predict_batch(ds.features(), 1).unwrap();
    assert_eq!(predictions, ds.labels());
    for tree in result.forest().trees() {
        match &tree.nodes()[0] {
            Node::Split { threshold, .. } => assert!(*threshold > 2.0 && *threshold < 10.0 + 1e-12),
            Node::Leaf { .. } => panic!("root should split"),
        }
    }
}
