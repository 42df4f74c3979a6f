//! Validate definition files and the reference graph.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::open_project;
use crate::definition::validation::validate_store;

#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Print the results as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ValidateCommand {
    pub fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let project = open_project(config_path)?;
        let result = validate_store(project.store())?;

        if self.json {
            let files: serde_json::Map<String, serde_json::Value> = result
                .files
                .iter()
                .map(|(name, report)| -> Result<(String, serde_json::Value)> {
                    Ok((name.clone(), serde_json::to_value(report)?))
                })
                .collect::<Result<_>>()?;
            let output = serde_json::json!({
                "valid": result.is_valid(),
                "functions": project.store().len(),
                "files": files,
                "unreadable": result.unreadable.iter().map(|(n, r)| serde_json::json!({"name": n, "reason": r})).collect::<Vec<_>>(),
                "dangling": result.dangling.iter().map(|d| serde_json::json!({"from": d.from, "to": d.to})).collect::<Vec<_>>(),
                "cycles": result.cycles,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else if result.is_valid() {
            println!("{} {} function(s) valid", "✓".green(), project.store().len());
        } else {
            print!("{result}");
        }

        if !result.is_valid() {
            bail!("Validation found {} problem(s)", result.problem_count());
        }
        Ok(())
    }
}
