use assert_cmd::Command;
use predicates::prelude::*;

use crate::common::TestProject;

fn udfkit(project: &TestProject) -> Command {
    let mut cmd = Command::cargo_bin("udfkit").unwrap();
    cmd.current_dir(project.project_path()).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_missing_config_exits_non_zero() {
    let project = TestProject::bare().unwrap();
    udfkit(&project)
        .arg("list")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("udfkit.toml not found"));
}

#[test]
fn test_explicit_config_path() {
    let project = TestProject::new().unwrap();
    project.add_sql("inc", "x + 1").unwrap();
    let elsewhere = TestProject::bare().unwrap();

    udfkit(&elsewhere)
        .arg("--config")
        .arg(project.config_path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("inc").and(predicate::str::contains("function_sql")));
}

#[test]
fn test_list_json_includes_dependencies_and_dependents() {
    let project = TestProject::new().unwrap();
    project.add_sql("c", "x").unwrap();
    project.add_sql("b", r#"{{ ref("c") }}(x)"#).unwrap();

    let output = udfkit(&project).args(["list", "--format", "json"]).output().unwrap();
    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries[0]["name"], "b");
    assert_eq!(entries[0]["dependencies"], serde_json::json!(["c"]));
    assert_eq!(entries[0]["dependents"], serde_json::json!([]));
    assert_eq!(entries[1]["kind"], "function_sql");
    assert_eq!(entries[1]["dependents"], serde_json::json!(["b"]));
}

#[test]
fn test_dry_run_deploy_needs_no_credentials() {
    let project = TestProject::new().unwrap();
    project.add_sql("c", "x + 1").unwrap();
    project.add_sql("b", r#"{{ ref("c") }}(x)"#).unwrap();

    udfkit(&project)
        .args(["deploy", "--dry-run", "--env", "prod"])
        .env_remove("GOOGLE_OAUTH_ACCESS_TOKEN")
        .assert()
        .success()
        .stdout(predicate::str::contains("Planned 2 function(s)"))
        .stderr(predicate::str::contains("Dry run: `udf-prod`.`utils`.`c` will not be deployed"));
}

#[test]
fn test_live_deploy_without_token_is_config_error() {
    let project = TestProject::new().unwrap();
    project.add_sql("c", "x").unwrap();

    udfkit(&project)
        .args(["deploy", "c"])
        .env_remove("GOOGLE_OAUTH_ACCESS_TOKEN")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GOOGLE_OAUTH_ACCESS_TOKEN"));
}

#[test]
fn test_cycle_aborts_deploy() {
    let project = TestProject::new().unwrap();
    project.add_sql("a", r#"{{ ref("b") }}(x)"#).unwrap();
    project.add_sql("b", r#"{{ ref("a") }}(x)"#).unwrap();

    udfkit(&project)
        .args(["deploy", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependency detected: a → b → a"))
        .stderr(predicate::str::contains("will not be deployed").not());
}

#[test]
fn test_unknown_environment() {
    let project = TestProject::new().unwrap();
    project.add_sql("c", "x").unwrap();

    udfkit(&project)
        .args(["render", "c", "--env", "qa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown environment 'qa'"));
}
