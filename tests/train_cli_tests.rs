//! CLI tests for `phantom-jam train` and `phantom-jam score`

mod utils;

use phantom_jam::model_persistence::load_detector;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_cli_help() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("phantom-jam");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("score"));
}

#[test]
fn test_train_prints_report_and_saves_model() {
    let dir = TempDir::new().unwrap();
    let dataset = utils::write_dataset(dir.path(), "dataset.csv", 100, 10, 11);
    let model = dir.path().join("model.apr");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("phantom-jam");
    cmd.arg("train")
        .arg("--dataset")
        .arg(&dataset)
        .arg("--model-out")
        .arg(&model)
        .assert()
        .success()
        .stdout(predicate::str::contains("Using distance threshold ="))
        .stdout(predicate::str::contains("DBSCAN PHANTOM JAM DETECTION"))
        .stdout(predicate::str::contains("Split: 80 train (8 jam) / 20 test (2 jam)"))
        .stdout(predicate::str::contains("Accuracy:"))
        .stdout(predicate::str::contains("F1 Score:"))
        .stdout(predicate::str::contains("Phantom jams detected (True Positive):"))
        .stdout(predicate::str::contains("Model saved as:"));

    let artifact = load_detector(&model).expect("saved model should load");
    assert_eq!(artifact.metadata.training_samples, 80);
    assert_eq!(
        artifact.metadata.hyperparameters.get("eps"),
        Some(&"0.55".to_string())
    );
    assert_eq!(artifact.metadata.dataset_sha256.as_ref().map(String::len), Some(64));
    assert!(!artifact.detector.reference_points.is_empty());
}

#[test]
fn test_train_missing_columns_fails_before_training() {
    let dir = TempDir::new().unwrap();
    let dataset = dir.path().join("bad.csv");
    std::fs::write(&dataset, "local_car_density,brake_events\n1.0,2\n").unwrap();
    let model = dir.path().join("model.apr");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("phantom-jam");
    cmd.arg("train")
        .arg("--dataset")
        .arg(&dataset)
        .arg("--model-out")
        .arg(&model)
        .assert()
        .failure()
        .stderr(predicate::str::contains("average_speed_kmph"))
        .stderr(predicate::str::contains("phantom_jam_flag"));

    assert!(!model.exists());
}

#[test]
fn test_train_missing_dataset_fails() {
    let dir = TempDir::new().unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("phantom-jam");
    cmd.current_dir(dir.path())
        .arg("train")
        .assert()
        .failure()
        .stderr(predicate::str::contains("dataset.csv"));
}

#[test]
fn test_train_with_config_file() {
    let dir = TempDir::new().unwrap();
    let dataset = utils::write_dataset(dir.path(), "dataset.csv", 100, 10, 12);
    let config = dir.path().join("detector.toml");
    std::fs::write(&config, "test_fraction = 0.3\ncompress = false\n").unwrap();
    let model = dir.path().join("model.apr");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("phantom-jam");
    cmd.arg("train")
        .arg("--dataset")
        .arg(&dataset)
        .arg("--model-out")
        .arg(&model)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Split: 70 train (7 jam) / 30 test (3 jam)"));

    assert!(model.exists());
}

#[test]
fn test_train_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let dataset = utils::write_dataset(dir.path(), "dataset.csv", 50, 5, 13);
    let config = dir.path().join("detector.toml");
    std::fs::write(&config, "eps = -1.0\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("phantom-jam");
    cmd.arg("train")
        .arg("--dataset")
        .arg(&dataset)
        .arg("--model-out")
        .arg(dir.path().join("model.apr"))
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("eps"));
}

#[test]
fn test_score_with_saved_model() {
    let dir = TempDir::new().unwrap();
    let dataset = utils::write_dataset(dir.path(), "dataset.csv", 100, 10, 14);
    let model = dir.path().join("model.apr");
    let predictions = dir.path().join("predictions.csv");

    assert_cmd::cargo::cargo_bin_cmd!("phantom-jam")
        .arg("train")
        .arg("--dataset")
        .arg(&dataset)
        .arg("--model-out")
        .arg(&model)
        .assert()
        .success();

    assert_cmd::cargo::cargo_bin_cmd!("phantom-jam")
        .arg("score")
        .arg("--model")
        .arg(&model)
        .arg("--dataset")
        .arg(&dataset)
        .arg("--output")
        .arg(&predictions)
        .assert()
        .success();

    let content = std::fs::read_to_string(&predictions).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("row,anomaly_score,predicted_jam,actual_jam")
    );
    assert_eq!(lines.count(), 100);

    // Each row's verdict agrees with the loaded detector
    let artifact = load_detector(&model).unwrap();
    for line in content.lines().skip(1) {
        let fields: Vec<&str> = line.split(',').collect();
        let score: f64 = fields[1].parse().unwrap();
        let predicted = fields[2] == "1";
        assert_eq!(predicted, artifact.detector.classify_score(score));
    }
}

#[test]
fn test_score_missing_model_fails() {
    let dir = TempDir::new().unwrap();
    let dataset = utils::write_dataset(dir.path(), "dataset.csv", 20, 2, 15);

    assert_cmd::cargo::cargo_bin_cmd!("phantom-jam")
        .arg("score")
        .arg("--model")
        .arg(dir.path().join("missing.apr"))
        .arg("--dataset")
        .arg(&dataset)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Model file not found"));
}
