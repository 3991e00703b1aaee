//! Integration tests for the gdb-freight CLI.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("gdb-freight").unwrap()
}

const SPOKE: &str = r#"
prefix: "GIS."
datasets: [transport]
feature_classes:
  roads:
    dataset: transport
    fields: [ROAD_ID, NAME]
    rows:
      - ["1", "Main St"]
      - ["2", "Elm St"]
tables:
  A_README:
    fields: [PROTOCOL, DB_TYPE, CONSTRAINTS, NOTE]
    rows:
      - ["EGC GEOSPATIAL DATA EXCHANGE PROTOCOL", "spoke", ~, ~]
  A_XCHANGE_PARAMETERS:
    fields: [OBJECT_NAME, IS_FDATASET, DIRECTIVE, SORT_FIELD, NOTE]
    rows:
      - ["GIS.transport", "1", ~, ~, ~]
      - ["GIS.zoning", "0", ~, ~, ~]
  zoning:
    fields: [ZONE_ID]
    rows:
      - ["A"]
      - ["B"]
"#;

const HUB: &str = r#"
tables:
  A_README:
    fields: [PROTOCOL, DB_TYPE, CONSTRAINTS, NOTE]
    rows:
      - ["EGC GEOSPATIAL DATA EXCHANGE PROTOCOL", "hub", ~, ~]
  A_XCHANGE_LOG:
    fields: [DATE, NOTE]
    rows: []
"#;

/// Write a spoke snapshot, a hub snapshot, and a config pointing at them.
fn fixtures() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("spoke.yaml"), SPOKE).unwrap();
    fs::write(dir.path().join("hub.yaml"), HUB).unwrap();
    fs::write(
        dir.path().join("config.yaml"),
        format!(
            concat!(
                "source:\n",
                "  workspace: {0}/spoke.yaml\n",
                "target:\n",
                "  workspace: {0}/hub.yaml\n",
                "exchange:\n",
                "  log_file: {0}/exchange.log\n",
            ),
            dir.path().display()
        ),
    )
    .unwrap();
    dir
}

fn config_arg(dir: &TempDir) -> String {
    dir.path().join("config.yaml").display().to_string()
}

fn hub_content(dir: &TempDir) -> String {
    fs::read_to_string(dir.path().join("hub.yaml")).unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gdb-freight"));
}

#[test]
fn test_missing_config_exits_with_2() {
    cmd()
        .args(["--config", "/nonexistent/config.yaml", "health-check"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_health_check_reports_roles() {
    let dir = fixtures();
    cmd()
        .args(["--config", &config_arg(&dir), "health-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("source is a spoke"))
        .stdout(predicate::str::contains("target is a hub"));
}

#[test]
fn test_health_check_fails_on_missing_log_table() {
    let dir = fixtures();
    fs::write(
        dir.path().join("hub.yaml"),
        HUB.replace("A_XCHANGE_LOG", "SOMETHING_ELSE"),
    )
    .unwrap();
    cmd()
        .args(["--config", &config_arg(&dir), "health-check"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_plan_lists_directives_without_writing() {
    let dir = fixtures();
    cmd()
        .args(["--config", &config_arg(&dir), "plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GIS.roads"))
        .stdout(predicate::str::contains("GIS.zoning"))
        .stdout(predicate::str::contains("feature dataset"));
    assert!(!hub_content(&dir).contains("roads"));
}

#[test]
fn test_run_transfers_and_persists_target() {
    let dir = fixtures();
    cmd()
        .args(["--config", &config_arg(&dir), "run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 transferred"))
        .stdout(predicate::str::contains("2 created"));

    // The target snapshot now holds the copied objects and log rows.
    let hub = hub_content(&dir);
    assert!(hub.contains("roads"));
    assert!(hub.contains("zoning"));
    assert!(hub.contains("Main St"));

    // The run report landed in the log file.
    let log = fs::read_to_string(dir.path().join("exchange.log")).unwrap();
    assert!(log.contains("Run completed."));
}

#[test]
fn test_run_twice_refreshes_instead_of_creating() {
    let dir = fixtures();
    let config = config_arg(&dir);
    cmd().args(["--config", &config, "run"]).assert().success();
    cmd()
        .args(["--config", &config, "run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 refreshed"));
}

#[test]
fn test_run_dry_run_writes_nothing() {
    let dir = fixtures();
    cmd()
        .args(["--config", &config_arg(&dir), "run", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 transferred"));
    assert!(!hub_content(&dir).contains("roads"));
}

#[test]
fn test_run_output_json() {
    let dir = fixtures();
    let output = cmd()
        .args(["--config", &config_arg(&dir), "run", "--output-json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(result["objects_transferred"], 2);
    assert_eq!(result["source_role"], "spoke");
    assert!(result["plan"]["directives"].as_array().unwrap().len() == 2);
}

#[test]
fn test_run_fails_cleanly_on_bad_protocol() {
    let dir = fixtures();
    fs::write(
        dir.path().join("spoke.yaml"),
        SPOKE.replace("EGC GEOSPATIAL DATA EXCHANGE PROTOCOL", "NOT THE PROTOCOL"),
    )
    .unwrap();
    cmd()
        .args(["--config", &config_arg(&dir), "run"])
        .assert()
        .failure()
        .code(2);
    assert!(!hub_content(&dir).contains("roads"));
}

#[test]
fn test_config_path_relative_resolution() {
    // Paths inside the config resolve against the working directory.
    let dir = fixtures();
    fs::write(
        dir.path().join("config.yaml"),
        concat!(
            "source:\n",
            "  workspace: spoke.yaml\n",
            "target:\n",
            "  workspace: hub.yaml\n",
            "exchange:\n",
            "  log_file: exchange.log\n",
        ),
    )
    .unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["--config", "config.yaml", "run"])
        .assert()
        .success();
    assert!(Path::new(&dir.path().join("exchange.log")).exists());
}
