//! udfkit - declarative BigQuery user-defined functions
//!
//! Functions are declared one per YAML file. A function's code may reference
//! other declared functions with `{{ ref("name") }}` markers; udfkit resolves
//! those references, renders each function with a kind-specific template, and
//! either deploys the functions dependencies first or composes a temporary
//! script that verifies a function against its test vectors.
//!
//! # Architecture
//!
//! ```text
//! DefinitionStore ──load──▶ FunctionDefinition
//!        │                        │ references::extract
//!        ▼                        ▼
//!     Composer ──visit (settled / in-progress)──▶ TemplateRenderer
//!        │                                              │
//!        ├── compose_temporary ──▶ harness ──▶ Executor  │
//!        └── plan_deployment ───▶ Deployer ──▶ Executor ◀┘
//! ```
//!
//! # Modules
//!
//! - [`definition`] - definition files, the store and structural validation
//! - [`references`] - reference marker extraction
//! - [`templating`] - the six statement templates and the renderer
//! - [`resolver`] - dependency traversal, composition and the whole-store graph
//! - [`deploy`] - executing deployment plans (or logging them in dry-run mode)
//! - [`harness`] - verification statements from test vectors, and the test runner
//! - [`executor`] - the executor boundary and the BigQuery REST client
//! - [`config`] / [`project`] - `udfkit.toml` and the loaded project
//! - [`cli`] - the `udfkit` command
//! - [`core`] - errors, function kinds, parameters
//!
//! # Example
//!
//! ```rust,no_run
//! use udfkit::core::Params;
//! use udfkit::definition::DefinitionStore;
//! use udfkit::resolver::{Composer, ResolutionState};
//! use udfkit::templating::TemplateRenderer;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = DefinitionStore::open("user_defined_functions")?;
//! let renderer = TemplateRenderer::default();
//! let composer = Composer::new(&store, &renderer);
//!
//! let params = Params::from([("env".to_string(), "dev".to_string())]);
//! let (plan, _) = composer.plan_deployment("add", &params, ResolutionState::new())?;
//! for step in &plan.steps {
//!     println!("{}", step.statement);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod definition;
pub mod deploy;
pub mod executor;
pub mod harness;
pub mod project;
pub mod references;
pub mod resolver;
pub mod templating;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
