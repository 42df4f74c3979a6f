//! Function definitions and the on-disk definition store.
//!
//! One YAML file declares one function; the file stem is the function name.
//!
//! ```yaml
//! type: function_sql
//! description: Adds two integers
//! project: "analytics-{{ env }}"
//! dataset: utils
//! arguments:
//!   - name: x
//!     type: INT64
//!   - name: y
//!     type: INT64
//! output:
//!   name: total
//!   type: INT64
//! code: |
//!   x + y
//! tests:
//!   - file: add_test.json
//! ```
//!
//! `project` and `dataset` are rendered with the caller's parameters when the
//! definition is loaded. `code` is kept raw: its reference markers are resolved
//! at composition time, where the render mode decides how a reference is
//! spelled.

mod store;
pub mod validation;

pub use store::{DefinitionCache, DefinitionStore};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_EXPECTED_ERROR_CODE;
use crate::core::FunctionKind;

/// One declared argument. The type is opaque text, compared but never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    /// Argument name
    pub name: String,
    /// Declared SQL type, e.g. `INT64` or `ANY TYPE`
    #[serde(rename = "type")]
    pub ty: String,
}

/// The declared output of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    /// Column name used for expected values in test tables
    pub name: String,
    /// Declared SQL return type
    #[serde(rename = "type")]
    pub ty: String,
}

/// A reference from a definition to a test vector file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRef {
    /// Path of the JSON vector file, relative to the definition's directory
    pub file: String,
    /// Every vector in the file is expected to make the function raise
    #[serde(default)]
    pub throws_exception: bool,
    /// Client error code the raising vectors must produce
    #[serde(default = "default_error_code")]
    pub error_code: u16,
}

const fn default_error_code() -> u16 {
    DEFAULT_EXPECTED_ERROR_CODE
}

/// Definition file contents as written, before templated fields are rendered.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub output: Option<Output>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub tests: Vec<TestRef>,
    #[serde(default)]
    pub library: Vec<String>,
}

/// Deployment target of a function, rendered from `project` and `dataset`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// Project id
    pub project: String,
    /// Dataset id
    pub dataset: String,
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}`.`{}`", self.project, self.dataset)
    }
}

/// A loaded function definition.
///
/// Immutable once loaded; identical `(name, params)` always produce an equal
/// value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    /// Unique name within the store (the file stem)
    pub name: String,
    /// Template family
    pub kind: FunctionKind,
    /// Human description, embedded in permanent statements
    pub description: Option<String>,
    /// Rendered deployment target; `None` when the file declares none
    pub namespace: Option<Namespace>,
    /// Ordered argument list
    pub arguments: Vec<Argument>,
    /// Declared output; procedures usually have none
    pub output: Option<Output>,
    /// Raw code body, reference markers unresolved
    pub code: String,
    /// Declared test vector files
    pub tests: Vec<TestRef>,
    /// JavaScript libraries (`gs://` paths) for script functions
    pub library: Vec<String>,
    /// File the definition was read from
    pub source_path: PathBuf,
}

impl FunctionDefinition {
    /// Fully-qualified, quoted name: `` `project`.`dataset`.`name` ``.
    #[must_use]
    pub fn qualified_name(&self) -> Option<String> {
        self.namespace.as_ref().map(|ns| format!("{ns}.`{}`", self.name))
    }

    /// Bare, quoted name used by temporary statements: `` `name` ``.
    #[must_use]
    pub fn bare_name(&self) -> String {
        format!("`{}`", self.name)
    }

    /// Names referenced by the code body, in first-occurrence order.
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        crate::references::extract(&self.code)
    }

    /// Path of a test vector file declared by this definition.
    #[must_use]
    pub fn test_path(&self, test: &TestRef) -> PathBuf {
        self.source_path.parent().unwrap_or_else(|| Path::new(".")).join(&test.file)
    }
}
