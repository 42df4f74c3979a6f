//! Command-line interface for udfkit.
//!
//! # Commands
//!
//! - `list` - declared functions with their kind and direct dependencies
//! - `render` - print the composed statement(s) for one function
//! - `deploy` - create functions in dependency order (or log them with `--dry-run`)
//! - `test` - run the test vectors of functions against the executor
//! - `validate` - check definition files and the reference graph
//! - `tree` - print dependency hierarchies
//!
//! # Global options
//!
//! - `-v, --verbose` - debug logging
//! - `-q, --quiet` - errors only
//! - `--config <PATH>` - use this `udfkit.toml` instead of searching upwards
//!
//! ```bash
//! udfkit render add --temp --env dev
//! udfkit deploy --env prod --dry-run
//! udfkit --verbose test add safe_divide
//! udfkit tree --invert inc
//! ```
//!
//! Log output goes to stderr; command results go to stdout, so
//! `udfkit render f > f.sql` captures only the statement.

pub mod common;
mod deploy;
mod list;
mod render;
mod tree;
mod validate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Runtime configuration derived from the global flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Log filter directive; `None` keeps `RUST_LOG` or the default
    pub log_level: Option<String>,
    /// Explicit configuration file
    pub config_path: Option<PathBuf>,
}

/// Declarative BigQuery user-defined functions.
#[derive(Debug, Parser)]
#[command(
    name = "udfkit",
    about = "Deploy and test BigQuery user-defined functions in dependency order",
    version,
    long_about = "udfkit renders declaratively defined BigQuery functions, deploys them \
                  dependencies first, and verifies them against test vectors."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output (traversal, statements, HTTP calls).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to udfkit.toml; searched for from the current directory by default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List declared functions.
    List(list::ListCommand),

    /// Print the composed statement(s) for a function.
    Render(render::RenderCommand),

    /// Deploy functions, dependencies first.
    Deploy(deploy::DeployCommand),

    /// Run test vectors against the executor.
    Test(test::TestCommand),

    /// Validate definition files and references.
    Validate(validate::ValidateCommand),

    /// Show dependency trees.
    Tree(tree::TreeCommand),
}

impl Cli {
    /// Install logging and run the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's error; the binary turns it into a user-facing
    /// message and a non-zero exit code.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        init_logging(config.log_level.as_deref());
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Run the selected command with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns the command's error.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let config_path = config.config_path;
        match self.command {
            Commands::List(cmd) => cmd.execute(config_path),
            Commands::Render(cmd) => cmd.execute(config_path),
            Commands::Deploy(cmd) => cmd.execute(config_path).await,
            Commands::Test(cmd) => cmd.execute(config_path).await,
            Commands::Validate(cmd) => cmd.execute(config_path),
            Commands::Tree(cmd) => cmd.execute(config_path),
        }
    }
}

/// Install the stderr `fmt` subscriber.
///
/// `level` wins over `RUST_LOG`; without either, `info` is used. Calling it
/// twice is harmless.
pub fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
