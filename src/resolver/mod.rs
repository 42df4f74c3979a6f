//! Dependency resolution and statement composition.
//!
//! # Algorithm
//!
//! Both composition modes share one depth-first walk rooted at a requested
//! function:
//!
//! 1. A name that is already **settled** is skipped.
//! 2. A name that is already **in progress** on the active path closes a cycle
//!    and fails with [`UdfError::CircularDependency`], naming the path from
//!    its first occurrence back to itself.
//! 3. Otherwise the name is pushed onto the in-progress path, its definition
//!    is loaded (through the per-call cache) and each dependency is visited in
//!    first-occurrence order.
//! 4. Once every dependency is settled the function itself is emitted, popped
//!    from the path and settled.
//!
//! Settled and in-progress names are tracked separately, so a diamond
//! (`a → b → d`, `a → c → d`) emits `d` once and is not mistaken for a cycle.
//!
//! # State
//!
//! [`ResolutionState`] is created fresh for each top-level call and threaded
//! through by value: every operation takes a state and returns the updated
//! one. Nothing is kept in globals, so independent calls never interfere, and
//! callers that deploy several functions in a row can pass the same state along
//! to deploy shared dependencies only once.
//!
//! # Modes
//!
//! - [`Composer::compose_temporary`] concatenates temporary statements into one
//!   script; references resolve to bare names.
//! - [`Composer::plan_deployment`] collects permanent statements in deployment
//!   order; references resolve to qualified names, rendered with the caller's
//!   parameters merged with any overrides on the marker.
//! - [`Composer::deploy`] plans first and only then executes, so a cycle or a
//!   missing definition anywhere in the graph means nothing is executed.
//!
//! [`UdfError::CircularDependency`]: crate::core::UdfError::CircularDependency

mod composer;
pub mod dependency_graph;

pub use composer::{Composer, DeploymentPlan, DeploymentStep};
pub use dependency_graph::{DanglingReference, DependencyGraph};

use anyhow::Result;
use std::collections::HashSet;

use crate::core::{Params, UdfError};
use crate::definition::{DefinitionCache, DefinitionStore};
use crate::references::Reference;
use crate::templating::ReferenceResolver;

/// Per-call traversal state: settled names, the active path and the
/// definition cache.
#[derive(Debug, Default)]
pub struct ResolutionState {
    settled: HashSet<String>,
    order: Vec<String>,
    in_progress: Vec<String>,
    cache: DefinitionCache,
}

impl ResolutionState {
    /// Empty state for a new top-level call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` has already been emitted in this call.
    #[must_use]
    pub fn is_settled(&self, name: &str) -> bool {
        self.settled.contains(name)
    }

    /// Settled names in the order they were emitted.
    #[must_use]
    pub fn settled(&self) -> &[String] {
        &self.order
    }

    /// Names on the active recursion path, outermost first.
    #[must_use]
    pub fn in_progress(&self) -> &[String] {
        &self.in_progress
    }

    fn enter(&mut self, name: &str) -> Result<()> {
        if let Some(start) = self.in_progress.iter().position(|n| n == name) {
            let mut chain = self.in_progress[start..].to_vec();
            chain.push(name.to_string());
            return Err(UdfError::CircularDependency {
                chain,
            }
            .into());
        }
        self.in_progress.push(name.to_string());
        Ok(())
    }

    fn settle(&mut self, name: &str) {
        if self.in_progress.last().is_some_and(|last| last == name) {
            self.in_progress.pop();
        }
        if self.settled.insert(name.to_string()) {
            self.order.push(name.to_string());
        }
    }
}

/// Resolves references to qualified names for permanent statements.
///
/// The referenced definition is loaded with the caller's parameters, overlaid
/// with the `key="value"` overrides written on the marker, so
/// `{{ ref("rates", env="prod") }}` always points at the production project.
pub struct QualifiedReferences<'a> {
    store: &'a DefinitionStore,
    params: &'a Params,
    cache: &'a mut DefinitionCache,
}

impl<'a> QualifiedReferences<'a> {
    /// Resolver loading through `cache`.
    pub fn new(store: &'a DefinitionStore, params: &'a Params, cache: &'a mut DefinitionCache) -> Self {
        Self {
            store,
            params,
            cache,
        }
    }
}

impl ReferenceResolver for QualifiedReferences<'_> {
    fn resolve(&mut self, reference: &Reference) -> Result<String> {
        let mut params = self.params.clone();
        params.extend(reference.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

        let definition = self.cache.get_or_load(self.store, &reference.name, &params)?;
        definition.qualified_name().ok_or_else(|| {
            UdfError::InvalidDefinition {
                name: reference.name.clone(),
                reason: "referenced from a permanent statement but declares no project/dataset"
                    .to_string(),
            }
            .into()
        })
    }
}
