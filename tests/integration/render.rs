use crate::common::TestProject;

fn chain_project() -> TestProject {
    let project = TestProject::new().unwrap();
    project.add_sql("c", "x + 1").unwrap();
    project.add_sql("b", r#"{{ ref("c") }}(x) * 2"#).unwrap();
    project
}

#[test]
fn test_render_permanent_statements_in_order() {
    let project = chain_project();
    let output = project.run_udfkit(&["render", "b"]).unwrap();
    output.assert_success();

    let stdout = &output.stdout;
    let c = stdout.find("CREATE OR REPLACE FUNCTION `udf-dev`.`utils`.`c`(x INT64)").unwrap();
    let b = stdout.find("CREATE OR REPLACE FUNCTION `udf-dev`.`utils`.`b`(x INT64)").unwrap();
    assert!(c < b);
    assert!(stdout.contains("OPTIONS (description = \"Integration function b\")"));
    assert!(stdout.contains("`udf-dev`.`utils`.`c`(x) * 2"));
}

#[test]
fn test_render_temporary_script() {
    let project = chain_project();
    let output = project.run_udfkit(&["render", "b", "--temp"]).unwrap();
    output.assert_success();
    assert_eq!(
        output.stdout,
        "CREATE TEMP FUNCTION `c`(x INT64)\nRETURNS INT64\nAS (\nx + 1\n);\n\n\
         CREATE TEMP FUNCTION `b`(x INT64)\nRETURNS INT64\nAS (\n`c`(x) * 2\n);\n"
    );
}

#[test]
fn test_render_environment_and_param_overrides() {
    let project = chain_project();
    project
        .run_udfkit(&["render", "c", "--env", "prod"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("`udf-prod`.`utils`.`c`");

    project
        .run_udfkit(&["render", "c", "--param", "suffix=sandbox"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("`udf-sandbox`.`utils`.`c`");
}

#[test]
fn test_render_undefined_variable_suggests_names() {
    let project = TestProject::new().unwrap();
    project.add_sql("scaled", "x * {{ factr }}").unwrap();
    let output = project
        .run_udfkit(&["render", "scaled", "--temp", "--param", "factor=3"])
        .unwrap();
    output.assert_failure().assert_stderr_contains("factr");
}

#[test]
fn test_render_unknown_function() {
    let project = chain_project();
    let output = project.run_udfkit(&["render", "bb"]).unwrap();
    output
        .assert_failure()
        .assert_stderr_contains("Function 'bb' is not defined")
        .assert_stderr_contains("b");
}
