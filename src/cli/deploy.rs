//! Deploy functions in dependency order.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{ParamArgs, open_project, select_names};
use crate::core::Params;
use crate::deploy::Deployer;
use crate::executor::{BigQueryExecutor, Executor};
use crate::project::Project;
use crate::resolver::ResolutionState;

#[derive(Debug, Args)]
pub struct DeployCommand {
    /// Functions to deploy; every declared function when omitted.
    pub names: Vec<String>,

    #[command(flatten)]
    pub params: ParamArgs,

    /// Log the statements instead of executing them.
    #[arg(long)]
    pub dry_run: bool,
}

impl DeployCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let project = open_project(config_path)?;
        let names = select_names(&project, &self.names)?;
        let params = self.params.resolve(&project)?;

        let deployed = if self.dry_run {
            let deployer = Deployer::<BigQueryExecutor>::dry_run();
            self.run(&project, &names, &params, &deployer).await?
        } else {
            let executor = project.executor(&params)?;
            let deployer = Deployer::live(&executor);
            self.run(&project, &names, &params, &deployer).await?
        };

        let verb = if self.dry_run {
            "Planned"
        } else {
            "Deployed"
        };
        println!("{} {} function(s)", verb.green().bold(), deployed.len());
        for name in &deployed {
            println!("  {name}");
        }
        Ok(())
    }

    async fn run<E: Executor>(
        &self,
        project: &Project,
        names: &[String],
        params: &Params,
        deployer: &Deployer<'_, E>,
    ) -> Result<Vec<String>> {
        let composer = project.composer();
        if self.names.is_empty() {
            return composer.deploy_all(params, deployer).await;
        }

        let mut state = ResolutionState::new();
        for name in names {
            state = composer.deploy(name, params, state, deployer).await?;
        }
        Ok(state.settled().to_vec())
    }
}
