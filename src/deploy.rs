//! Executing deployment plans.

use anyhow::Result;

use crate::core::UdfError;
use crate::executor::Executor;
use crate::resolver::DeploymentPlan;

/// Runs a [`DeploymentPlan`] against an executor, or logs it in dry-run mode.
///
/// Statements run strictly in plan order. The first failure stops the run;
/// nothing is rolled back or retried.
#[derive(Debug)]
pub struct Deployer<'a, E> {
    executor: Option<&'a E>,
}

impl<'a, E: Executor> Deployer<'a, E> {
    /// Execute statements with `executor`.
    #[must_use]
    pub fn live(executor: &'a E) -> Self {
        Self {
            executor: Some(executor),
        }
    }

    /// Log statements without executing anything.
    #[must_use]
    pub fn dry_run() -> Self {
        Self {
            executor: None,
        }
    }

    /// Whether this deployer only logs.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.executor.is_none()
    }

    /// Run every step of `plan` and return the names deployed, in order.
    ///
    /// # Errors
    ///
    /// Returns [`UdfError::ExecutionFailure`] for the first statement the
    /// executor rejects, listing the functions deployed before it.
    pub async fn run(&self, plan: &DeploymentPlan) -> Result<Vec<String>> {
        let mut deployed = Vec::with_capacity(plan.len());

        for step in &plan.steps {
            match self.executor {
                None => {
                    tracing::info!("Dry run: {} will not be deployed", step.target);
                    tracing::info!("The statement that would be executed is:\n{}", step.statement);
                }
                Some(executor) => {
                    tracing::info!("Creating function {}", step.target);
                    executor.execute(&step.statement).await.map_err(|e| {
                        tracing::error!("Failed to create {}: {}", step.target, e);
                        UdfError::ExecutionFailure {
                            name: step.name.clone(),
                            code: e.code(),
                            message: e.message().to_string(),
                            deployed: deployed.clone(),
                        }
                    })?;
                    tracing::info!("Successfully created {}", step.target);
                }
            }
            deployed.push(step.name.clone());
        }

        Ok(deployed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorError;
    use crate::resolver::DeploymentStep;
    use crate::test_utils::RecordingExecutor;

    fn plan() -> DeploymentPlan {
        DeploymentPlan {
            steps: ["c", "b", "a"]
                .iter()
                .map(|name| DeploymentStep {
                    name: (*name).to_string(),
                    target: format!("`p`.`d`.`{name}`"),
                    statement: format!("CREATE OR REPLACE FUNCTION `p`.`d`.`{name}`() AS (1);"),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_live_run_executes_in_order() {
        let executor = RecordingExecutor::new();
        let deployed = Deployer::live(&executor).run(&plan()).await.unwrap();
        assert_eq!(deployed, vec!["c", "b", "a"]);
        let statements = executor.statements();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains("`c`"));
        assert!(statements[2].contains("`a`"));
    }

    #[tokio::test]
    async fn test_dry_run_never_executes() {
        let deployer = Deployer::<RecordingExecutor>::dry_run();
        assert!(deployer.is_dry_run());
        let deployed = deployer.run(&plan()).await.unwrap();
        assert_eq!(deployed, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_failure_stops_and_reports_partial_deployment() {
        let executor = RecordingExecutor::new().fail_when(
            "`b`",
            ExecutorError::Client {
                code: 400,
                message: "Syntax error".to_string(),
            },
        );
        let err = Deployer::live(&executor).run(&plan()).await.unwrap_err();
        match err.downcast_ref::<UdfError>() {
            Some(UdfError::ExecutionFailure {
                name,
                code,
                deployed,
                ..
            }) => {
                assert_eq!(name, "b");
                assert_eq!(*code, Some(400));
                assert_eq!(deployed, &vec!["c".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // `a` was never attempted
        assert_eq!(executor.statements().len(), 2);
    }
}
