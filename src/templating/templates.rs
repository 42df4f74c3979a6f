//! The six kind templates and their on-disk overrides.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::TemplateError;

const BUILTIN_TEMPLATES: [(&str, &str); 6] = [
    ("function_sql.sql", include_str!("../../templates/function_sql.sql")),
    ("function_js.sql", include_str!("../../templates/function_js.sql")),
    ("procedure.sql", include_str!("../../templates/procedure.sql")),
    ("temp_function_sql.sql", include_str!("../../templates/temp_function_sql.sql")),
    ("temp_function_js.sql", include_str!("../../templates/temp_function_js.sql")),
    ("temp_procedure.sql", include_str!("../../templates/temp_procedure.sql")),
];

/// Template sources keyed by file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    templates: BTreeMap<String, String>,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateSet {
    /// The templates shipped with the crate.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            templates: BUILTIN_TEMPLATES
                .iter()
                .map(|(name, source)| ((*name).to_string(), (*source).to_string()))
                .collect(),
        }
    }

    /// Built-in templates, with any same-named file in `dir` taking precedence.
    ///
    /// Files in `dir` that do not match a template name are ignored with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` or one of its template files cannot be read.
    pub fn with_overrides(dir: &Path) -> Result<Self> {
        let mut set = Self::builtin();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read templates directory {}", dir.display()))?;

        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to read templates directory {}", dir.display()))?
                .path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !set.templates.contains_key(file_name) {
                tracing::warn!("Ignoring unknown template file {}", path.display());
                continue;
            }
            let source = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            tracing::debug!("Using template override {}", path.display());
            set.templates.insert(file_name.to_string(), source);
        }
        Ok(set)
    }

    /// Source of the template called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnknownTemplate`] for names outside the set.
    pub fn get(&self, name: &str) -> Result<&str, TemplateError> {
        self.templates.get(name).map(String::as_str).ok_or_else(|| {
            TemplateError::UnknownTemplate {
                name: name.to_string(),
            }
        })
    }

    /// Template file names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}
