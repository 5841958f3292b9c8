//! End-to-end integration tests: CSV -> fit -> JSON -> deserialize.

use std::fs;
use std::path::Path;

use frugal_fft::{Algorithm, Counts, FftConfig};
use frugal_io::{DatasetReader, ExperimentName, IoError, ResultWriter};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn read_heart() -> frugal_fft::Dataset {
    DatasetReader::new(&fixture_path("heart.csv"))
        .with_outcome("diagnosis")
        .read()
        .expect("fixture should parse")
}

#[test]
fn fit_round_trip() {
    // 1. Read CSV and split
    let dataset = read_heart();
    assert_eq!(dataset.n_cases(), 24);
    assert_eq!(dataset.n_cues(), 4);
    assert_eq!(dataset.n_positive(), 12);

    let (train, test) = dataset.split_stratified(0.75, 42).unwrap();
    assert_eq!(train.n_cases(), 18);
    assert_eq!(test.n_cases(), 6);

    // 2. Fit
    let result = FftConfig::new()
        .with_algorithm(Algorithm::Conditional)
        .with_max_levels(3)
        .fit(&train, Some(&test))
        .unwrap();

    // 3. Write JSON artifact
    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("heart_rt".into()).unwrap();
    let writer = ResultWriter::new(dir.path(), experiment).unwrap();
    let path = writer.write_fit(&result).unwrap();
    assert_eq!(path, dir.path().join("heart_rt_trees.json"));

    // 4. Deserialize back and verify
    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(content["experiment"], "heart_rt");
    assert_eq!(content["metadata"]["algorithm"], "conditional");
    assert_eq!(content["metadata"]["n_train"].as_u64().unwrap(), 18);
    assert_eq!(content["metadata"]["n_test"].as_u64().unwrap(), 6);

    let trees = content["trees"].as_array().unwrap();
    assert_eq!(
        trees.len() as u64,
        content["metadata"]["n_candidates"].as_u64().unwrap()
    );
    assert!(!trees.is_empty());

    for (i, tree) in trees.iter().enumerate() {
        assert_eq!(tree["rank"].as_u64().unwrap(), i as u64 + 1);

        let nodes = tree["nodes"].as_array().unwrap();
        let pattern = tree["pattern"].as_str().unwrap();
        assert_eq!(pattern.len(), nodes.len());
        assert!(pattern.ends_with('B'), "pattern {pattern} must end terminal");
        assert_eq!(nodes.last().unwrap()["exit"], "both");

        // Every training case is decided at exactly one level
        let train_n = tree["train"]["overall"]["n"].as_u64().unwrap();
        assert_eq!(train_n, 18);
        let decided: u64 = tree["train"]["levels"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["decided"].as_u64().unwrap())
            .sum();
        assert_eq!(decided, train_n);

        assert_eq!(tree["test"]["overall"]["n"].as_u64().unwrap(), 6);
    }
}

#[test]
fn best_tree_predictions_match_test_table() {
    let dataset = read_heart();
    let (train, test) = dataset.split_stratified(0.75, 42).unwrap();
    let result = FftConfig::new().fit(&train, Some(&test)).unwrap();

    let predictions = result.predict(&test).unwrap();
    let counts = Counts::from_decisions(&predictions, test.outcomes());
    let best = result.best().unwrap();
    assert_eq!(best.test.as_ref().unwrap().overall.counts, counts);
}

#[test]
fn cues_round_trip() {
    let dataset = read_heart();
    let ranking = FftConfig::new().rank_cues(&dataset).unwrap();

    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("heart_cues".into()).unwrap();
    let writer = ResultWriter::new(dir.path(), experiment).unwrap();
    let path = writer.write_cues(&ranking).unwrap();
    assert_eq!(path, dir.path().join("heart_cues_cues.json"));

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "heart_cues");

    let cues = content["cues"].as_array().unwrap();
    assert_eq!(cues.len(), 4);
    assert!(content["skipped"].as_array().unwrap().is_empty());

    // Ranked best first by balanced accuracy
    let scores: Vec<f64> = cues
        .iter()
        .map(|c| c["stats"]["bacc"].as_f64().unwrap_or(f64::NEG_INFINITY))
        .collect();
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1], "scores not descending: {scores:?}");
    }

    let cp = cues.iter().find(|c| c["name"] == "cp").unwrap();
    assert_eq!(cp["threshold"]["kind"], "categorical");
    let age = cues.iter().find(|c| c["name"] == "age").unwrap();
    assert_eq!(age["threshold"]["kind"], "numeric");
}

#[test]
fn reader_fixture_files_match_expected_errors() {
    // empty.csv -> EmptyDataset
    let result = DatasetReader::new(&fixture_path("empty.csv")).read();
    assert!(
        matches!(result, Err(IoError::EmptyDataset { .. })),
        "empty.csv should give EmptyDataset, got: {:?}",
        result
    );

    // jagged.csv -> InconsistentRowLength
    let result = DatasetReader::new(&fixture_path("jagged.csv")).read();
    assert!(
        matches!(result, Err(IoError::InconsistentRowLength { .. })),
        "jagged.csv should give InconsistentRowLength, got: {:?}",
        result
    );
}

#[test]
fn invalid_experiment_name_rejected() {
    let result = ExperimentName::new("bad name!".into());
    assert!(matches!(result, Err(IoError::InvalidExperimentName { .. })));
}
