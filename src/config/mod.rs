//! Project configuration (`udfkit.toml`).
//!
//! The configuration file marks the project root. Every path in it is
//! relative to the directory containing the file.
//!
//! ```toml
//! definitions_dir = "user_defined_functions"
//! templates_dir = "templates"          # optional overrides of the built-in templates
//! default_environment = "dev"
//!
//! [params]                             # always applied
//! region = "eu"
//!
//! [environments.dev]
//! project_suffix = "dev"
//!
//! [environments.prod]
//! project_suffix = "prod"
//!
//! [executor]
//! project = "analytics-dev"
//! location = "EU"
//! token_env = "GOOGLE_OAUTH_ACCESS_TOKEN"
//! timeout_secs = 300
//! ```
//!
//! # Parameter precedence
//!
//! From lowest to highest:
//!
//! 1. `[params]`
//! 2. the selected `[environments.<name>]` table
//! 3. `env = <name>` itself
//! 4. `--param key=value` from the command line
//!
//! The environment is `--env` when given, else `default_environment`. Naming
//! an environment without a table is allowed; only `env` is set then.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{CONFIG_FILE_NAME, DEFAULT_DEFINITIONS_DIR, ENV_PARAM};
use crate::core::{Params, UdfError};
use crate::executor::BigQuerySettings;

/// Settings for the BigQuery executor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Project the query jobs run in
    pub project: Option<String>,
    /// Job location
    pub location: Option<String>,
    /// Environment variable holding the access token
    pub token_env: Option<String>,
    /// REST endpoint override
    pub endpoint: Option<String>,
    /// Deadline for one statement, in seconds
    pub timeout_secs: Option<u64>,
}

/// Parsed `udfkit.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Directory holding the definition files
    #[serde(default = "default_definitions_dir")]
    pub definitions_dir: PathBuf,
    /// Directory with template overrides
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
    /// Environment used when none is requested
    #[serde(default)]
    pub default_environment: Option<String>,
    /// Parameters applied in every environment
    #[serde(default)]
    pub params: Params,
    /// Named parameter sets
    #[serde(default)]
    pub environments: BTreeMap<String, Params>,
    /// Executor settings
    #[serde(default)]
    pub executor: ExecutorConfig,
}

fn default_definitions_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DEFINITIONS_DIR)
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            definitions_dir: default_definitions_dir(),
            templates_dir: None,
            default_environment: None,
            params: Params::new(),
            environments: BTreeMap::new(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, and
    /// [`UdfError::ConfigError`] if it is not valid configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content).map_err(|e| UdfError::ConfigError {
            message: format!("{}: {}", path.display(), e.message()),
        })?;
        Ok(config)
    }

    /// Rendering parameters for `environment` (or the default environment),
    /// with `overrides` applied last.
    ///
    /// # Errors
    ///
    /// Returns [`UdfError::ConfigError`] if environments are declared and
    /// the selected one is not among them.
    pub fn params(&self, environment: Option<&str>, overrides: &Params) -> Result<Params> {
        let mut params = self.params.clone();

        if let Some(env) = environment.or(self.default_environment.as_deref()) {
            match self.environments.get(env) {
                Some(table) => params.extend(table.clone()),
                None if !self.environments.is_empty() => {
                    let declared: Vec<&str> = self.environments.keys().map(String::as_str).collect();
                    return Err(UdfError::ConfigError {
                        message: format!(
                            "unknown environment '{env}' (declared: {})",
                            declared.join(", ")
                        ),
                    }
                    .into());
                }
                None => {}
            }
            params.insert(ENV_PARAM.to_string(), env.to_string());
        }

        params.extend(overrides.clone());
        Ok(params)
    }

    /// Executor settings, falling back to `project` when no executor project
    /// is configured.
    ///
    /// # Errors
    ///
    /// Returns [`UdfError::ConfigError`] when neither is available.
    pub fn executor_settings(&self, project: Option<&str>) -> Result<BigQuerySettings> {
        let project = self
            .executor
            .project
            .as_deref()
            .or(project)
            .ok_or_else(|| UdfError::ConfigError {
                message: "no executor project configured; set [executor] project".to_string(),
            })?;

        let mut settings = BigQuerySettings::new(project);
        settings.location.clone_from(&self.executor.location);
        if let Some(endpoint) = &self.executor.endpoint {
            settings.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(token_env) = &self.executor.token_env {
            settings.token_env.clone_from(token_env);
        }
        if let Some(secs) = self.executor.timeout_secs {
            settings.timeout = Duration::from_secs(secs);
        }
        Ok(settings)
    }
}

/// Search for `udfkit.toml` from the current directory upwards.
///
/// # Errors
///
/// Returns [`UdfError::ConfigNotFound`] if no file is found.
pub fn find_config() -> Result<PathBuf> {
    let current = std::env::current_dir().context("Cannot determine current working directory")?;
    find_config_from(current)
}

/// Use `explicit` if given, otherwise search from the current directory.
///
/// # Errors
///
/// Returns [`UdfError::ConfigNotFound`] if the explicit file does not exist
/// or the search finds nothing.
pub fn find_config_with_optional(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.is_file() => Ok(path),
        Some(_) => Err(UdfError::ConfigNotFound.into()),
        None => find_config(),
    }
}

/// Search for `udfkit.toml` from `current` upwards.
///
/// # Errors
///
/// Returns [`UdfError::ConfigNotFound`] after reaching the filesystem root.
pub fn find_config_from(mut current: PathBuf) -> Result<PathBuf> {
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !current.pop() {
            return Err(UdfError::ConfigNotFound.into());
        }
    }
}
