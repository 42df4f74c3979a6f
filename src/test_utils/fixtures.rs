//! On-disk definition fixtures.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::definition::DefinitionStore;

/// A temporary definitions directory.
///
/// Files are removed when the fixture is dropped. Helpers panic on I/O
/// errors; they are meant for tests only.
#[derive(Debug)]
pub struct DefinitionFixture {
    dir: TempDir,
}

impl Default for DefinitionFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionFixture {
    /// Create an empty definitions directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temporary definitions directory"),
        }
    }

    /// Root of the definitions directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture directory");
        }
        fs::write(&path, content).expect("write fixture file");
        path
    }

    /// Write `<name>.yaml` with the given YAML.
    pub fn add_definition(&self, name: &str, yaml: &str) -> PathBuf {
        self.write(&format!("{name}.yaml"), yaml)
    }

    /// Write a `function_sql` definition `name(x INT64) -> INT64` deployed to
    /// `udf-{{ env }}`.`utils`, with `code` as its body.
    pub fn add_sql(&self, name: &str, code: &str) -> PathBuf {
        let body: String = code.lines().map(|line| format!("  {line}\n")).collect();
        self.add_definition(
            name,
            &format!(
                "type: function_sql\n\
                 description: Test function {name}\n\
                 project: \"udf-{{{{ env }}}}\"\n\
                 dataset: utils\n\
                 arguments:\n  \
                   - name: x\n    \
                     type: INT64\n\
                 output:\n  \
                   name: expected\n  \
                   type: INT64\n\
                 code: |-\n{body}"
            ),
        )
    }

    /// Write a JSON test vector file.
    pub fn add_vectors(&self, relative: &str, vectors: &serde_json::Value) -> PathBuf {
        let content = serde_json::to_string_pretty(vectors).expect("serialize test vectors");
        self.write(relative, &content)
    }

    /// Open a store over the fixture directory.
    #[must_use]
    pub fn store(&self) -> DefinitionStore {
        DefinitionStore::open(self.dir.path()).expect("open fixture store")
    }
}
