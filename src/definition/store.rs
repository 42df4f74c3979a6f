//! Definition discovery and loading.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strsim::levenshtein;
use walkdir::WalkDir;

use super::{FunctionDefinition, Namespace, RawDefinition};
use crate::constants::{DEFINITION_EXTENSIONS, MAX_NAME_SUGGESTIONS};
use crate::core::{FunctionKind, Params, UdfError};
use crate::templating::render_field;

/// Read-only index of the definition files under one directory.
///
/// Opening the store only records which names exist and where; each
/// [`load`](Self::load) reads and parses the file again, so loading is a pure
/// function of the name, the parameters and the file contents.
#[derive(Debug, Clone)]
pub struct DefinitionStore {
    root: PathBuf,
    files: BTreeMap<String, PathBuf>,
}

impl DefinitionStore {
    /// Index every `*.yaml` / `*.yml` file below `root`, recursively.
    ///
    /// # Errors
    ///
    /// - [`UdfError::FileSystemError`] if `root` is not a readable directory
    /// - [`UdfError::DuplicateDefinition`] if two files share a stem
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(UdfError::FileSystemError {
                operation: "open definitions directory".to_string(),
                path: root.display().to_string(),
            }
            .into());
        }

        let mut files = BTreeMap::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry
                .with_context(|| format!("Failed to scan definitions in {}", root.display()))?;
            if !entry.file_type().is_file() || !is_definition_file(entry.path()) {
                continue;
            }
            let Some(name) = entry.path().file_stem().and_then(|s| s.to_str()) else {
                tracing::warn!("Skipping definition with non UTF-8 name: {}", entry.path().display());
                continue;
            };
            if let Some(first) = files.insert(name.to_string(), entry.path().to_path_buf()) {
                return Err(UdfError::DuplicateDefinition {
                    name: name.to_string(),
                    first: first.display().to_string(),
                    second: entry.path().display().to_string(),
                }
                .into());
            }
        }

        tracing::debug!("Indexed {} definition(s) under {}", files.len(), root.display());
        Ok(Self {
            root,
            files,
        })
    }

    /// Directory the store was opened on.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All declared names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    /// Whether `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Number of declared functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the store declares no functions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Load `name`, rendering its templated fields with `params`.
    ///
    /// # Errors
    ///
    /// - [`UdfError::DefinitionNotFound`] when no file declares `name`
    /// - [`UdfError::DefinitionParseError`] for malformed YAML
    /// - [`UdfError::UnsupportedKind`] for an unknown `type`
    /// - [`UdfError::InvalidDefinition`] when only one of `project`/`dataset` is set
    /// - [`UdfError::Template`] when a templated field fails to render
    pub fn load(&self, name: &str, params: &Params) -> Result<FunctionDefinition> {
        let path = self.files.get(name).ok_or_else(|| self.not_found(name))?;
        let raw = self.read_raw(name, path)?;
        let kind: FunctionKind = raw.kind.parse()?;

        let namespace = match (&raw.project, &raw.dataset) {
            (Some(project), Some(dataset)) => Some(Namespace {
                project: render_field(name, "project", project, params)?,
                dataset: render_field(name, "dataset", dataset, params)?,
            }),
            (None, None) => None,
            (Some(_), None) | (None, Some(_)) => {
                return Err(UdfError::InvalidDefinition {
                    name: name.to_string(),
                    reason: "'project' and 'dataset' must be declared together".to_string(),
                }
                .into());
            }
        };

        tracing::debug!("Loaded definition '{}' ({}) from {}", name, kind, path.display());
        Ok(FunctionDefinition {
            name: name.to_string(),
            kind,
            description: raw.description,
            namespace,
            arguments: raw.arguments,
            output: raw.output,
            code: raw.code,
            tests: raw.tests,
            library: raw.library,
            source_path: path.clone(),
        })
    }

    /// Parse a definition file into an untyped YAML value, for validation.
    pub fn load_value(&self, name: &str) -> Result<serde_yaml::Value> {
        let path = self.files.get(name).ok_or_else(|| self.not_found(name))?;
        let text = read_file(path)?;
        serde_yaml::from_str(&text).map_err(|e| {
            UdfError::DefinitionParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn read_raw(&self, name: &str, path: &Path) -> Result<RawDefinition> {
        let text = read_file(path)?;
        serde_yaml::from_str(&text)
            .map_err(|e| UdfError::DefinitionParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
            .with_context(|| format!("Failed to load definition '{name}'"))
    }

    fn not_found(&self, name: &str) -> anyhow::Error {
        UdfError::DefinitionNotFound {
            name: name.to_string(),
            suggestions: self.similar_names(name),
        }
        .into()
    }

    /// Declared names within edit distance of `name`, closest first.
    #[must_use]
    pub fn similar_names(&self, name: &str) -> Vec<String> {
        let threshold = (name.len() / 2).max(1);
        let mut scored: Vec<(usize, &String)> = self
            .files
            .keys()
            .map(|candidate| (levenshtein(name, candidate), candidate))
            .filter(|(distance, _)| *distance <= threshold)
            .collect();
        scored.sort();
        scored.into_iter().take(MAX_NAME_SUGGESTIONS).map(|(_, n)| n.clone()).collect()
    }
}

fn is_definition_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DEFINITION_EXTENSIONS.contains(&ext))
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        anyhow::Error::new(UdfError::FileSystemError {
            operation: "read definition".to_string(),
            path: path.display().to_string(),
        })
        .context(e.to_string())
    })
}

/// Definitions loaded during one resolution call.
///
/// Keyed by name and parameter set: a `ref(...)` marker with overrides loads
/// the referenced definition under different parameters than the caller.
#[derive(Debug, Clone, Default)]
pub struct DefinitionCache {
    entries: HashMap<(String, Params), Arc<FunctionDefinition>>,
}

impl DefinitionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached definition or load and remember it.
    pub fn get_or_load(
        &mut self,
        store: &DefinitionStore,
        name: &str,
        params: &Params,
    ) -> Result<Arc<FunctionDefinition>> {
        let key = (name.to_string(), params.clone());
        if let Some(definition) = self.entries.get(&key) {
            return Ok(Arc::clone(definition));
        }
        let definition = Arc::new(store.load(name, params)?);
        self.entries.insert(key, Arc::clone(&definition));
        Ok(definition)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been loaded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
