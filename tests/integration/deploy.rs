use udfkit::core::{Params, UdfError};
use udfkit::deploy::Deployer;
use udfkit::executor::ExecutorError;
use udfkit::project::Project;
use udfkit::resolver::ResolutionState;
use udfkit::test_utils::{RecordingExecutor, init_test_logging};

use crate::common::TestProject;

fn open(project: &TestProject) -> Project {
    Project::open(&project.config_path()).unwrap()
}

fn dev_params(project: &Project) -> Params {
    project.params(None, &Params::new()).unwrap()
}

fn chain(project: &TestProject) {
    project.add_sql("c", "x + 1").unwrap();
    project.add_sql("b", r#"{{ ref("c") }}(x) * 2"#).unwrap();
    project.add_sql("a", r#"{{ ref("b") }}(x) - 3"#).unwrap();
}

/// `C`, `B(ref C)`, `A(ref B)` deploy as C, B, A with qualified references
#[tokio::test]
async fn test_chain_deploys_dependencies_first() {
    init_test_logging(None);
    let test_project = TestProject::new().unwrap();
    chain(&test_project);
    let project = open(&test_project);
    let params = dev_params(&project);

    let executor = RecordingExecutor::new();
    let state = project
        .composer()
        .deploy("a", &params, ResolutionState::new(), &Deployer::live(&executor))
        .await
        .unwrap();

    assert_eq!(state.settled(), &["c", "b", "a"]);
    let statements = executor.statements();
    assert_eq!(statements.len(), 3);
    assert!(statements[0].starts_with("CREATE OR REPLACE FUNCTION `udf-dev`.`utils`.`c`(x INT64)"));
    assert!(statements[1].contains("`udf-dev`.`utils`.`c`(x) * 2"));
    assert!(statements[2].contains("`udf-dev`.`utils`.`b`(x) - 3"));
}

/// A settled dependency is not deployed again by a later call with the same state
#[tokio::test]
async fn test_state_is_threaded_between_calls() {
    let test_project = TestProject::new().unwrap();
    chain(&test_project);
    test_project.add_sql("d", r#"{{ ref("c") }}(x)"#).unwrap();
    let project = open(&test_project);
    let params = dev_params(&project);
    let composer = project.composer();

    let executor = RecordingExecutor::new();
    let deployer = Deployer::live(&executor);
    let state = composer.deploy("b", &params, ResolutionState::new(), &deployer).await.unwrap();
    let state = composer.deploy("d", &params, state, &deployer).await.unwrap();

    assert_eq!(state.settled(), &["c", "b", "d"]);
    assert_eq!(executor.statements().len(), 3);
}

/// A ↔ B is rejected before any statement runs
#[tokio::test]
async fn test_cycle_executes_nothing() {
    let test_project = TestProject::new().unwrap();
    test_project.add_sql("a", r#"{{ ref("b") }}(x)"#).unwrap();
    test_project.add_sql("b", r#"{{ ref("a") }}(x)"#).unwrap();
    let project = open(&test_project);
    let params = dev_params(&project);

    let executor = RecordingExecutor::new();
    let err = project
        .composer()
        .deploy("a", &params, ResolutionState::new(), &Deployer::live(&executor))
        .await
        .unwrap_err();

    match err.downcast_ref::<UdfError>() {
        Some(UdfError::CircularDependency {
            chain,
        }) => {
            assert!(chain.contains(&"a".to_string()));
            assert!(chain.contains(&"b".to_string()));
        }
        other => panic!("expected a circular dependency, got {other:?}"),
    }
    assert!(executor.statements().is_empty());
}

/// Diamond A→B, A→C, B→D, C→D: no false cycle, D once
#[tokio::test]
async fn test_diamond_deploys_shared_dependency_once() {
    let test_project = TestProject::new().unwrap();
    test_project.add_sql("d", "x").unwrap();
    test_project.add_sql("b", r#"{{ ref("d") }}(x) + 1"#).unwrap();
    test_project.add_sql("c", r#"{{ ref("d") }}(x) + 2"#).unwrap();
    test_project.add_sql("a", r#"{{ ref("b") }}(x) + {{ ref("c") }}(x)"#).unwrap();
    let project = open(&test_project);
    let params = dev_params(&project);

    let executor = RecordingExecutor::new();
    let deployed = project.composer().deploy_all(&params, &Deployer::live(&executor)).await.unwrap();

    assert_eq!(deployed, vec!["d", "b", "c", "a"]);
    let creates_d = executor
        .statements()
        .iter()
        .filter(|s| s.starts_with("CREATE OR REPLACE FUNCTION `udf-dev`.`utils`.`d`"))
        .count();
    assert_eq!(creates_d, 1);
}

/// A failure mid-sequence stops the run and reports what was deployed
#[tokio::test]
async fn test_failure_reports_partial_deployment() {
    let test_project = TestProject::new().unwrap();
    chain(&test_project);
    let project = open(&test_project);
    let params = dev_params(&project);

    let executor = RecordingExecutor::new().fail_when(
        "`utils`.`b`(x INT64)",
        ExecutorError::Client {
            code: 400,
            message: "Function not found: c".to_string(),
        },
    );
    let err = project
        .composer()
        .deploy("a", &params, ResolutionState::new(), &Deployer::live(&executor))
        .await
        .unwrap_err();

    match err.downcast_ref::<UdfError>() {
        Some(UdfError::ExecutionFailure {
            name,
            deployed,
            ..
        }) => {
            assert_eq!(name, "b");
            assert_eq!(deployed, &vec!["c".to_string()]);
        }
        other => panic!("expected an execution failure, got {other:?}"),
    }
    assert_eq!(executor.statements().len(), 2);
}

/// Dry runs report the full order without touching the executor
#[tokio::test]
async fn test_dry_run_deploy_all() {
    let test_project = TestProject::new().unwrap();
    chain(&test_project);
    let project = open(&test_project);
    let params = project.params(Some("prod"), &Params::new()).unwrap();

    let deployer = Deployer::<RecordingExecutor>::dry_run();
    let deployed = project.composer().deploy_all(&params, &deployer).await.unwrap();
    assert_eq!(deployed, vec!["c", "b", "a"]);
}

/// Marker overrides change where the referenced function is looked up
#[tokio::test]
async fn test_reference_overrides_select_namespace() {
    let test_project = TestProject::new().unwrap();
    test_project.add_sql("c", "x + 1").unwrap();
    test_project.add_sql("shared", r#"{{ ref("c", suffix="prod") }}(x)"#).unwrap();
    let project = open(&test_project);
    let params = dev_params(&project);

    let (plan, _) =
        project.composer().plan_deployment("shared", &params, ResolutionState::new()).unwrap();
    assert_eq!(plan.names(), vec!["c", "shared"]);
    assert!(plan.steps[1].statement.contains("`udf-prod`.`utils`.`c`(x)"));
    assert_eq!(plan.steps[1].target, "`udf-dev`.`utils`.`shared`");
}
