//! List declared functions.

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::common::open_project;
use crate::project::Project;
use crate::resolver::DependencyGraph;

/// Output format of `list`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// Aligned text
    #[default]
    Table,
    /// JSON array
    Json,
}

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ListFormat::Table)]
    pub format: ListFormat,
}

#[derive(Debug, Serialize)]
struct ListEntry {
    name: String,
    kind: String,
    description: Option<String>,
    dependencies: Vec<String>,
    dependents: Vec<String>,
}

impl ListCommand {
    pub fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let project = open_project(config_path)?;
        let entries = collect_entries(&project)?;

        match self.format {
            ListFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            ListFormat::Table => {
                if entries.is_empty() {
                    println!("No functions declared in {}", project.store().root().display());
                    return Ok(());
                }
                let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
                for entry in &entries {
                    let dependencies = if entry.dependencies.is_empty() {
                        String::new()
                    } else {
                        format!(" → {}", entry.dependencies.join(", "))
                    };
                    let dependents = if entry.dependents.is_empty() {
                        String::new()
                    } else {
                        format!(" (used by {})", entry.dependents.join(", "))
                    };
                    println!(
                        "{}  {}{}{}",
                        format!("{:width$}", entry.name).bold(),
                        format!("{:12}", entry.kind).cyan(),
                        dependencies.dimmed(),
                        dependents.dimmed(),
                    );
                }
            }
        }
        Ok(())
    }
}

/// Kind, direct dependencies and direct dependents straight from the raw
/// files, so `list` works without rendering parameters.
fn collect_entries(project: &Project) -> Result<Vec<ListEntry>> {
    let store = project.store();
    let graph = DependencyGraph::from_store(store)?;
    store
        .names()
        .into_iter()
        .map(|name| -> Result<ListEntry> {
            let value = store.load_value(&name)?;
            let text = |key: &str| value.get(key).and_then(serde_yaml::Value::as_str).map(str::to_string);
            Ok(ListEntry {
                kind: text("type").unwrap_or_else(|| "?".to_string()),
                description: text("description"),
                dependencies: crate::references::extract(&text("code").unwrap_or_default()),
                dependents: graph.direct_dependents(&name),
                name,
            })
        })
        .collect()
}
