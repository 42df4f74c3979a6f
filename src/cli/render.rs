//! Print the statements composed for one function.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::common::{ParamArgs, open_project, select_names};
use crate::resolver::ResolutionState;

#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Function to render.
    pub name: String,

    /// Render the temporary script used for testing instead of the
    /// deployment statements.
    #[arg(long)]
    pub temp: bool,

    #[command(flatten)]
    pub params: ParamArgs,
}

impl RenderCommand {
    pub fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let project = open_project(config_path)?;
        select_names(&project, std::slice::from_ref(&self.name))?;
        let params = self.params.resolve(&project)?;
        let composer = project.composer();

        let output = if self.temp {
            let (script, _) = composer.compose_temporary(&self.name, &params, ResolutionState::new())?;
            script
        } else {
            let (plan, _) = composer.plan_deployment(&self.name, &params, ResolutionState::new())?;
            plan.steps
                .iter()
                .map(|step| format!("-- {}\n{}", step.target, step.statement))
                .collect::<Vec<_>>()
                .join("\n\n")
        };
        println!("{output}");
        Ok(())
    }
}
