//! Arguments and helpers shared by several commands.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::core::{Params, UdfError, parse_param};
use crate::project::Project;

/// `--env` / `--param` selection of rendering parameters.
#[derive(Debug, Clone, Default, Args)]
pub struct ParamArgs {
    /// Environment from udfkit.toml; also sets the `env` parameter.
    #[arg(short, long)]
    pub env: Option<String>,

    /// Extra rendering parameter, repeatable: --param key=value
    #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub param: Vec<(String, String)>,
}

impl ParamArgs {
    /// Final parameters for `project`.
    ///
    /// # Errors
    ///
    /// Fails for an undeclared environment.
    pub fn resolve(&self, project: &Project) -> Result<Params> {
        let overrides: Params = self.param.iter().cloned().collect();
        let params = project.params(self.env.as_deref(), &overrides)?;
        tracing::debug!("Rendering parameters: {:?}", params);
        Ok(params)
    }
}

/// Open the project for a command.
///
/// # Errors
///
/// Fails when the project cannot be located or loaded.
pub fn open_project(config_path: Option<PathBuf>) -> Result<Project> {
    Project::discover(config_path)
}

/// `names` checked against the store, or every declared name when empty.
///
/// # Errors
///
/// Returns [`UdfError::DefinitionNotFound`] for the first undeclared name.
pub fn select_names(project: &Project, names: &[String]) -> Result<Vec<String>> {
    let store = project.store();
    if names.is_empty() {
        return Ok(store.names());
    }
    for name in names {
        if !store.contains(name) {
            return Err(UdfError::DefinitionNotFound {
                name: name.clone(),
                suggestions: store.similar_names(name),
            }
            .into());
        }
    }
    Ok(names.to_vec())
}
