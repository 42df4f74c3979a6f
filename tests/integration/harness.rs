use serde_json::json;
use udfkit::core::Params;
use udfkit::executor::{ExecutorError, RowSet};
use udfkit::harness::{Outcome, enumerate_tests, run_tests};
use udfkit::project::Project;
use udfkit::test_utils::RecordingExecutor;

use crate::common::TestProject;

const SAFE_DIVIDE: &str = r#"type: function_sql
description: Divides, raising on a zero divisor
project: "udf-{{ suffix }}"
dataset: math
arguments:
  - name: num
    type: FLOAT64
  - name: den
    type: FLOAT64
output:
  name: quotient
  type: FLOAT64
code: IF(den = 0, ERROR("division by zero"), {{ ref("ratio") }}(num, den))
tests:
  - file: vectors/safe_divide.json
"#;

const RATIO: &str = r#"type: function_sql
description: Plain ratio
project: "udf-{{ suffix }}"
dataset: math
arguments:
  - name: a
    type: FLOAT64
  - name: b
    type: FLOAT64
output:
  name: r
  type: FLOAT64
code: a / b
"#;

fn divide_project() -> TestProject {
    let project = TestProject::new().unwrap();
    project.add_definition("ratio", RATIO).unwrap();
    project.add_definition("safe_divide", SAFE_DIVIDE).unwrap();
    project
        .add_vectors(
            "vectors/safe_divide.json",
            &json!([
                {"args": [6, 3], "expected_output": 2},
                {"args": {"den": 4, "num": 1}, "output": 0.25},
                {"args": [1, 0], "expects_error": true}
            ]),
        )
        .unwrap();
    project
}

#[tokio::test]
async fn test_verification_embeds_temporary_dependency_chain() {
    let test_project = divide_project();
    let project = Project::open(&test_project.config_path()).unwrap();
    let params = project.params(None, &Params::new()).unwrap();

    let cases =
        enumerate_tests(&project.composer(), &["safe_divide".to_string()], &params).unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].id, "safe_divide::safe_divide");

    let comparison = cases[0].verification.comparison.as_deref().unwrap();
    let ratio = comparison.find("CREATE TEMP FUNCTION `ratio`").unwrap();
    let divide = comparison.find("CREATE TEMP FUNCTION `safe_divide`").unwrap();
    assert!(ratio < divide);
    assert!(comparison.contains("`ratio`(num, den)"));
    assert!(comparison.contains(
        r#"select cast("1" as FLOAT64) as num, cast("4" as FLOAT64) as den, cast("0.25" as FLOAT64) as quotient"#
    ));
    assert!(comparison.contains("where quotient is distinct from `safe_divide`(num, den);"));
    assert!(!comparison.contains("udf-dev"));

    let probes = &cases[0].verification.error_probes;
    assert_eq!(probes.len(), 1);
    assert!(probes[0].statement.contains(r#"select `safe_divide`(cast("1" as FLOAT64), cast("0" as FLOAT64));"#));
}

#[tokio::test]
async fn test_runner_distinguishes_outcomes() {
    let test_project = divide_project();
    let project = Project::open(&test_project.config_path()).unwrap();
    let params = project.params(None, &Params::new()).unwrap();
    let cases = enumerate_tests(&project.composer(), &project.store().names(), &params).unwrap();

    // Correct function: no mismatching rows, the probe raises a client error
    let passing = RecordingExecutor::new().fail_when(
        "-- Error probe",
        ExecutorError::Client {
            code: 400,
            message: "division by zero".to_string(),
        },
    );
    let report = run_tests(&cases, &passing).await;
    assert!(report.is_success());
    assert_eq!(report.passed(), 2);

    // Broken function: rows come back and the probe succeeds
    let rows = RowSet::new(
        vec!["num".to_string(), "den".to_string(), "quotient".to_string(), "result".to_string()],
        vec![vec!["6".to_string(), "3".to_string(), "2".to_string(), "3".to_string()]],
    );
    let failing = RecordingExecutor::new().respond_when("-- Test for", rows);
    let report = run_tests(&cases, &failing).await;
    assert_eq!(report.failed(), 2);
    let outcomes: Vec<_> = report.failures().map(|r| &r.outcome).collect();
    assert!(matches!(outcomes[0], Outcome::Mismatch(rows) if rows.len() == 1));
    assert!(matches!(outcomes[1], Outcome::UnexpectedSuccess));
}

#[test]
fn test_cli_prints_verification_statements() {
    let test_project = divide_project();
    let output = test_project.run_udfkit(&["test", "safe_divide", "--print"]).unwrap();
    output
        .assert_success()
        .assert_stdout_contains("-- Test for safe_divide")
        .assert_stdout_contains("with test_cte_safe_divide as (")
        .assert_stdout_contains("-- expects client error 400");
}

#[test]
fn test_cli_reports_missing_vector_file() {
    let test_project = TestProject::new().unwrap();
    test_project.add_sql_with_tests("inc", "x + 1", &["missing.json"]).unwrap();
    let output = test_project.run_udfkit(&["test", "--print"]).unwrap();
    output.assert_failure().assert_stderr_contains("missing.json");
}
