//! Print dependency trees.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::common::{open_project, select_names};
use crate::resolver::DependencyGraph;

#[derive(Debug, Args)]
pub struct TreeCommand {
    /// Root function; every function nothing else references when omitted.
    pub name: Option<String>,

    /// Show the functions that reference each node instead of its dependencies.
    #[arg(short, long)]
    pub invert: bool,
}

impl TreeCommand {
    pub fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let project = open_project(config_path)?;
        let graph = DependencyGraph::from_store(project.store())?;

        let roots = match &self.name {
            Some(name) => select_names(&project, std::slice::from_ref(name))?,
            None if self.invert => project.store().names(),
            None => {
                let roots = graph.roots();
                if roots.is_empty() {
                    project.store().names()
                } else {
                    roots
                }
            }
        };

        let trees: Vec<String> =
            roots.iter().map(|root| graph.to_tree_string(root, self.invert)).collect();
        print!("{}", trees.join("\n"));

        for dangling in graph.dangling_references() {
            tracing::warn!("'{}' references undeclared function '{}'", dangling.from, dangling.to);
        }
        Ok(())
    }
}
