//! The shared traversal and its two terminal actions.

use anyhow::Result;
use std::sync::Arc;

use super::{QualifiedReferences, ResolutionState};
use crate::core::{Params, RenderMode};
use crate::deploy::Deployer;
use crate::definition::{DefinitionStore, FunctionDefinition};
use crate::executor::Executor;
use crate::templating::{BareReferences, TemplateRenderer};

/// Separator between statements of a composed temporary script.
const STATEMENT_SEPARATOR: &str = "\n\n";

/// One permanent statement of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentStep {
    /// Function name
    pub name: String,
    /// Qualified target the statement creates
    pub target: String,
    /// Rendered `CREATE OR REPLACE` statement
    pub statement: String,
}

/// Permanent statements in deployment order: every dependency precedes the
/// functions that reference it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentPlan {
    /// Steps to execute, in order
    pub steps: Vec<DeploymentStep>,
}

impl DeploymentPlan {
    /// Function names in deployment order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name.as_str()).collect()
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether there is nothing to deploy.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Composes statements for functions of one definition store.
#[derive(Debug, Clone, Copy)]
pub struct Composer<'a> {
    store: &'a DefinitionStore,
    renderer: &'a TemplateRenderer,
}

impl<'a> Composer<'a> {
    /// Composer over `store`, rendering with `renderer`.
    #[must_use]
    pub fn new(store: &'a DefinitionStore, renderer: &'a TemplateRenderer) -> Self {
        Self {
            store,
            renderer,
        }
    }

    /// The store definitions are loaded from.
    #[must_use]
    pub fn store(&self) -> &'a DefinitionStore {
        self.store
    }

    /// One script holding the temporary statement of every unsettled
    /// dependency of `name`, dependencies first, followed by `name` itself.
    ///
    /// Returns an empty script when `name` is already settled in `state`.
    ///
    /// # Errors
    ///
    /// - `CircularDependency` if `name` reaches itself
    /// - `DefinitionNotFound` for an undeclared dependency, unchanged
    /// - any load or render failure
    pub fn compose_temporary(
        &self,
        name: &str,
        params: &Params,
        state: ResolutionState,
    ) -> Result<(String, ResolutionState)> {
        let mut pieces = Vec::new();
        let mut emit = |definition: &FunctionDefinition, _: &mut ResolutionState| -> Result<()> {
            let statement =
                self.renderer.render(definition, RenderMode::Temporary, params, &mut BareReferences)?;
            pieces.push(statement);
            Ok(())
        };
        let state = self.visit(name, params, state, &mut emit)?;
        Ok((pieces.join(STATEMENT_SEPARATOR), state))
    }

    /// Permanent statements for `name` and its unsettled dependencies, in
    /// deployment order.
    ///
    /// # Errors
    ///
    /// Fails like [`compose_temporary`](Self::compose_temporary); nothing is
    /// executed.
    pub fn plan_deployment(
        &self,
        name: &str,
        params: &Params,
        state: ResolutionState,
    ) -> Result<(DeploymentPlan, ResolutionState)> {
        let mut plan = DeploymentPlan::default();
        let mut emit = |definition: &FunctionDefinition, state: &mut ResolutionState| -> Result<()> {
            let mut references = QualifiedReferences::new(self.store, params, &mut state.cache);
            let statement =
                self.renderer.render(definition, RenderMode::Permanent, params, &mut references)?;
            plan.steps.push(DeploymentStep {
                name: definition.name.clone(),
                target: definition.qualified_name().unwrap_or_else(|| definition.bare_name()),
                statement,
            });
            Ok(())
        };
        let state = self.visit(name, params, state, &mut emit)?;
        Ok((plan, state))
    }

    /// One plan covering every function in `names`, sharing a single state so
    /// common dependencies appear once.
    ///
    /// # Errors
    ///
    /// Fails on the first function that cannot be planned.
    pub fn plan_all(&self, names: &[String], params: &Params) -> Result<DeploymentPlan> {
        let mut state = ResolutionState::new();
        let mut plan = DeploymentPlan::default();
        for name in names {
            let (partial, next) = self.plan_deployment(name, params, state)?;
            plan.steps.extend(partial.steps);
            state = next;
        }
        Ok(plan)
    }

    /// Deploy `name` and its unsettled dependencies.
    ///
    /// The whole plan is built before the first statement runs. A live run
    /// stops at the first failing statement; functions created before it stay
    /// deployed.
    ///
    /// # Errors
    ///
    /// - any planning error, in which case nothing was executed
    /// - `ExecutionFailure` naming the failed function and those already deployed
    pub async fn deploy<E: Executor>(
        &self,
        name: &str,
        params: &Params,
        state: ResolutionState,
        deployer: &Deployer<'_, E>,
    ) -> Result<ResolutionState> {
        let (plan, state) = self.plan_deployment(name, params, state)?;
        deployer.run(&plan).await?;
        Ok(state)
    }

    /// Deploy every declared function, each shared dependency once.
    ///
    /// Returns the deployed names in order.
    ///
    /// # Errors
    ///
    /// Fails like [`deploy`](Self::deploy).
    pub async fn deploy_all<E: Executor>(
        &self,
        params: &Params,
        deployer: &Deployer<'_, E>,
    ) -> Result<Vec<String>> {
        let plan = self.plan_all(&self.store.names(), params)?;
        deployer.run(&plan).await
    }

    fn visit<F>(
        &self,
        name: &str,
        params: &Params,
        mut state: ResolutionState,
        emit: &mut F,
    ) -> Result<ResolutionState>
    where
        F: FnMut(&FunctionDefinition, &mut ResolutionState) -> Result<()>,
    {
        if state.is_settled(name) {
            tracing::debug!("'{}' already settled", name);
            return Ok(state);
        }
        state.enter(name)?;

        let definition: Arc<FunctionDefinition> =
            state.cache.get_or_load(self.store, name, params)?;
        let dependencies = definition.dependencies();
        tracing::debug!("Resolving '{}' (depends on: {:?})", name, dependencies);

        for dependency in &dependencies {
            if state.is_settled(dependency) {
                continue;
            }
            state = self.visit(dependency, params, state, emit)?;
        }

        emit(definition.as_ref(), &mut state)?;
        state.settle(name);
        Ok(state)
    }
}
