//! Common test utilities for udfkit integration tests
//!
//! [`TestProject`] lays out a complete project on disk (`udfkit.toml` plus a
//! definitions directory) and runs the `udfkit` binary inside it.

// Not every helper is used by every test file
#![allow(dead_code)]

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Default configuration: one `dev` environment, executor project `runner`.
pub const DEFAULT_CONFIG: &str = r#"
definitions_dir = "user_defined_functions"
default_environment = "dev"

[environments.dev]
suffix = "dev"

[environments.prod]
suffix = "prod"

[executor]
project = "runner"
"#;

/// A temporary udfkit project.
pub struct TestProject {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    project_dir: PathBuf,
}

impl TestProject {
    /// Project with [`DEFAULT_CONFIG`] and an empty definitions directory.
    pub fn new() -> Result<Self> {
        let project = Self::bare()?;
        project.write_config(DEFAULT_CONFIG)?;
        fs::create_dir_all(project.definitions_path())?;
        Ok(project)
    }

    /// Empty directory without any configuration.
    pub fn bare() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().join("project");
        fs::create_dir_all(&project_dir)?;
        Ok(Self {
            _temp_dir: temp_dir,
            project_dir,
        })
    }

    /// Project root
    pub fn project_path(&self) -> &Path {
        &self.project_dir
    }

    /// Definitions directory
    pub fn definitions_path(&self) -> PathBuf {
        self.project_dir.join("user_defined_functions")
    }

    /// Path of `udfkit.toml`
    pub fn config_path(&self) -> PathBuf {
        self.project_dir.join("udfkit.toml")
    }

    /// Overwrite `udfkit.toml`
    pub fn write_config(&self, content: &str) -> Result<()> {
        let path = self.config_path();
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Write a file below the definitions directory
    pub fn write_definition_file(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.definitions_path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Write `<name>.yaml`
    pub fn add_definition(&self, name: &str, yaml: &str) -> Result<PathBuf> {
        self.write_definition_file(&format!("{name}.yaml"), yaml)
    }

    /// Write a one-argument INT64 SQL function deployed to
    /// `udf-{{ suffix }}`.`utils`
    pub fn add_sql(&self, name: &str, code: &str) -> Result<PathBuf> {
        self.add_definition(name, &sql_definition(name, code, &[]))
    }

    /// Like [`add_sql`](Self::add_sql), with test vector files
    pub fn add_sql_with_tests(&self, name: &str, code: &str, tests: &[&str]) -> Result<PathBuf> {
        self.add_definition(name, &sql_definition(name, code, tests))
    }

    /// Write a JSON vector file below the definitions directory
    pub fn add_vectors(&self, relative: &str, vectors: &serde_json::Value) -> Result<PathBuf> {
        self.write_definition_file(relative, &serde_json::to_string_pretty(vectors)?)
    }

    /// Run `udfkit` in the project directory
    pub fn run_udfkit(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new(env!("CARGO_BIN_EXE_udfkit"))
            .args(args)
            .current_dir(&self.project_dir)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .output()
            .context("Failed to run udfkit")?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

/// YAML of a one-argument INT64 SQL function.
pub fn sql_definition(name: &str, code: &str, tests: &[&str]) -> String {
    let mut yaml = format!(
        "type: function_sql\n\
         description: Integration function {name}\n\
         project: \"udf-{{{{ suffix }}}}\"\n\
         dataset: utils\n\
         arguments:\n  - name: x\n    type: INT64\n\
         output:\n  name: expected\n  type: INT64\n\
         code: '{code}'\n"
    );
    if !tests.is_empty() {
        yaml.push_str("tests:\n");
        for test in tests {
            yaml.push_str(&format!("  - file: {test}\n"));
        }
    }
    yaml
}

/// Captured output of one `udfkit` run
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Assert the command succeeded
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success,
            "Command failed with code {:?}\nStderr: {}",
            self.code, self.stderr
        );
        self
    }

    /// Assert the command failed
    pub fn assert_failure(&self) -> &Self {
        assert!(!self.success, "Command unexpectedly succeeded\nStdout: {}", self.stdout);
        self
    }

    /// Assert stdout contains the given text
    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Expected stdout to contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    /// Assert stderr contains the given text
    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Expected stderr to contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}
