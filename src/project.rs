//! A loaded project: configuration, definition store and renderer.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{ProjectConfig, find_config_with_optional};
use crate::core::Params;
use crate::definition::DefinitionStore;
use crate::executor::BigQueryExecutor;
use crate::resolver::Composer;
use crate::templating::{TemplateRenderer, TemplateSet};

/// Everything the commands need, resolved from one `udfkit.toml`.
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    config: ProjectConfig,
    store: DefinitionStore,
    renderer: TemplateRenderer,
}

impl Project {
    /// Locate and open the project: `config_path` if given, otherwise the
    /// nearest `udfkit.toml` above the current directory.
    ///
    /// # Errors
    ///
    /// Fails when no configuration is found, or when the configuration, the
    /// definitions directory or the template overrides cannot be loaded.
    pub fn discover(config_path: Option<PathBuf>) -> Result<Self> {
        let path = find_config_with_optional(config_path)?;
        Self::open(&path)
    }

    /// Open the project described by the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// See [`discover`](Self::discover).
    pub fn open(path: &Path) -> Result<Self> {
        let config = ProjectConfig::load(path)?;
        let root = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self::from_config(root, config)
    }

    /// Build a project from an already parsed configuration rooted at `root`.
    ///
    /// # Errors
    ///
    /// See [`discover`](Self::discover).
    pub fn from_config(root: PathBuf, config: ProjectConfig) -> Result<Self> {
        let store = DefinitionStore::open(root.join(&config.definitions_dir))
            .context("Failed to open the definitions directory")?;
        let templates = match &config.templates_dir {
            Some(dir) => TemplateSet::with_overrides(&root.join(dir))?,
            None => TemplateSet::builtin(),
        };
        tracing::debug!("Opened project at {} with {} function(s)", root.display(), store.len());
        Ok(Self {
            root,
            config,
            store,
            renderer: TemplateRenderer::new(templates),
        })
    }

    /// Directory holding `udfkit.toml`.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parsed configuration.
    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// The definition store.
    #[must_use]
    pub fn store(&self) -> &DefinitionStore {
        &self.store
    }

    /// A composer over this project's store and templates.
    #[must_use]
    pub fn composer(&self) -> Composer<'_> {
        Composer::new(&self.store, &self.renderer)
    }

    /// Rendering parameters; see [`ProjectConfig::params`].
    ///
    /// # Errors
    ///
    /// Fails for an undeclared environment.
    pub fn params(&self, environment: Option<&str>, overrides: &Params) -> Result<Params> {
        self.config.params(environment, overrides)
    }

    /// A BigQuery executor configured from `[executor]`, falling back to
    /// the rendered `project` parameter for the job project.
    ///
    /// # Errors
    ///
    /// Fails when no project is known or the access token is missing.
    pub fn executor(&self, params: &Params) -> Result<BigQueryExecutor> {
        let settings =
            self.config.executor_settings(params.get("project").map(String::as_str))?;
        BigQueryExecutor::new(settings)
    }
}
