//! Integration tests for the abpm binary.
//!
//! These tests verify end-to-end behavior including:
//! - Index computation for a single measurement
//! - Dataset assembly from stored tests
//! - Input validation at the command boundary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a test data directory with an empty config file
fn setup_test_dir() -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "").expect("Failed to write config");
    (temp_dir, config_path)
}

/// Helper to get the path to the CLI binary
fn cli(config_path: &Path) -> Command {
    let mut cmd = Command::cargo_bin("abpm").expect("Failed to find abpm binary");
    cmd.arg("--config").arg(config_path);
    cmd
}

fn compute_args() -> Vec<&'static str> {
    vec![
        "compute",
        "--age",
        "40",
        "--weight",
        "70",
        "--height",
        "1.75",
        "--systolic",
        "120",
        "--diastolic",
        "80",
        "--heart-rate",
        "70",
    ]
}

/// Store one pulled test the way the puller does
fn write_record(records_dir: &Path, id: u64) {
    fs::create_dir_all(records_dir).unwrap();
    let record = serde_json::json!({
        "id": id,
        "data": [
            {"fecha_dt": "2019-3-1 10:00:00", "sistolica": 120, "diastolica": 80, "valor": 70},
            {"fecha_dt": "2019-3-1 10:20:00", "sistolica": "131", "diastolica": "85", "valor": "66"}
        ],
        "meta_data": [
            {"fecha_nacimiento": "1979-02-15", "fecha_inicio": "2019-03-01",
             "inicio_noche": "22:00", "fin_noche": "06:00",
             "genero": "F", "talla": 175, "peso": 70}
        ],
        "measure": [],
        "drugs": []
    });
    fs::write(
        records_dir.join(format!("{}.json", id)),
        serde_json::to_string(&record).unwrap(),
    )
    .unwrap();
}

#[test]
fn test_cli_help() {
    let (_temp_dir, config_path) = setup_test_dir();
    cli(&config_path)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Ambulatory blood pressure monitoring",
        ));
}

#[test]
fn test_compute_prints_every_index() {
    let (_temp_dir, config_path) = setup_test_dir();
    cli(&config_path)
        .args(compute_args())
        .assert()
        .success()
        .stdout(predicate::str::contains("mean_arterial_pressure"))
        .stdout(predicate::str::contains("94.0000"))
        .stdout(predicate::str::contains("pulse_wave_velocity"))
        .stdout(predicate::str::contains("dyn·s/cm⁵"));
}

#[test]
fn test_compute_json_output() {
    let (_temp_dir, config_path) = setup_test_dir();
    let output = cli(&config_path)
        .args(compute_args())
        .arg("--json")
        .output()
        .expect("Failed to run abpm");
    assert!(output.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is not JSON");
    assert_eq!(value["indices"]["pulse_pressure"], 40.0);
    assert_eq!(value["indices"]["mean_arterial_pressure"], 94.0);
    assert_eq!(
        value["measurement"]["left_ventricular_ejection_fraction"],
        0.65
    );
    assert_eq!(value["indices"].as_object().unwrap().len(), 22);
}

#[test]
fn test_compute_rejects_inverted_pressures() {
    let (_temp_dir, config_path) = setup_test_dir();
    cli(&config_path)
        .args([
            "compute",
            "--age",
            "40",
            "--weight",
            "70",
            "--height",
            "1.75",
            "--systolic",
            "80",
            "--diastolic",
            "120",
            "--heart-rate",
            "70",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be greater than diastolic"));
}

#[test]
fn test_dataset_with_indices() {
    let (temp_dir, config_path) = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    write_record(&data_dir.join("api-data"), 12);

    cli(&config_path)
        .arg("dataset")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 rows"))
        .stdout(predicate::str::contains("Indices computed for 2 rows, 0 skipped"));

    let csv_path = data_dir.join("sleep_dataset.csv");
    let mut reader = csv::Reader::from_path(&csv_path).expect("dataset missing");
    let headers = reader.headers().unwrap().clone();
    assert!(headers.iter().any(|h| h == "cardiac_output"));

    let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "12");
}

#[test]
fn test_dataset_without_indices() {
    let (temp_dir, config_path) = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    write_record(&data_dir.join("api-data"), 3);
    let output = temp_dir.path().join("raw.csv");

    cli(&config_path)
        .arg("dataset")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--output")
        .arg(&output)
        .arg("--no-indices")
        .assert()
        .success();

    let mut reader = csv::Reader::from_path(&output).expect("dataset missing");
    assert_eq!(reader.headers().unwrap().len(), 12);
    assert_eq!(reader.records().count(), 2);
}

#[test]
fn test_dataset_without_pulled_tests() {
    let (temp_dir, config_path) = setup_test_dir();

    cli(&config_path)
        .arg("dataset")
        .arg("--data-dir")
        .arg(temp_dir.path().join("empty"))
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to build"));
}

#[test]
fn test_invalid_config_is_reported() {
    let (temp_dir, _) = setup_test_dir();
    let bad_config = temp_dir.path().join("bad.toml");
    fs::write(&bad_config, "[pull]\nconcurrent_workers = 0\n").unwrap();

    cli(&bad_config)
        .args(compute_args())
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrent_workers"));
}
