use crate::common::TestProject;

#[test]
fn test_validate_valid_project() {
    let project = TestProject::new().unwrap();
    project.add_sql("c", "x + 1").unwrap();
    project.add_sql("b", r#"{{ ref("c") }}(x)"#).unwrap();

    project
        .run_udfkit(&["validate"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("2 function(s) valid");
}

#[test]
fn test_validate_reports_every_problem() {
    let project = TestProject::new().unwrap();
    project.add_sql("a", r#"{{ ref("b") }}(x)"#).unwrap();
    project.add_sql("b", r#"{{ ref("a") }}(x) + {{ ref("ghost") }}(x)"#).unwrap();
    project.add_definition("incomplete", "type: function_rust\ncode: x\n").unwrap();

    let output = project.run_udfkit(&["validate"]).unwrap();
    output
        .assert_failure()
        .assert_stdout_contains("incomplete: missing key .description")
        .assert_stdout_contains("incomplete: invalid value at .type")
        .assert_stdout_contains("b: references undeclared function 'ghost'")
        .assert_stdout_contains("circular reference: a → b → a");
}

#[test]
fn test_validate_json_output() {
    let project = TestProject::new().unwrap();
    project.add_sql("c", "x").unwrap();

    let output = project.run_udfkit(&["validate", "--json"]).unwrap();
    output.assert_success();
    let value: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(value["valid"], true);
    assert_eq!(value["functions"], 1);
}

#[test]
fn test_tree_and_inverted_tree() {
    let project = TestProject::new().unwrap();
    project.add_sql("d", "x").unwrap();
    project.add_sql("b", r#"{{ ref("d") }}(x)"#).unwrap();
    project.add_sql("a", r#"{{ ref("b") }}(x) + {{ ref("d") }}(x)"#).unwrap();

    let output = project.run_udfkit(&["tree"]).unwrap();
    output.assert_success();
    assert!(output.stdout.starts_with("a\n├── b\n│   └── d\n└── d\n"), "{}", output.stdout);

    project
        .run_udfkit(&["tree", "d", "--invert"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("d\n├── a\n└── b\n    └── a\n");
}
