//! Test vector files and typed SQL literals.
//!
//! A vector file is a JSON list:
//!
//! ```json
//! [
//!   {"args": [2, 3], "expected_output": 5},
//!   {"args": {"y": 1, "x": 0}, "output": 1},
//!   {"args": [1, 0], "expects_error": true}
//! ]
//! ```
//!
//! `args` is either positional or keyed by argument name; `output` is accepted
//! as an alias of `expected_output`.

use anyhow::Result;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::core::UdfError;
use crate::definition::Argument;

/// Arguments of one vector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VectorArgs {
    /// Values in declaration order
    Positional(Vec<Value>),
    /// Values keyed by argument name
    Named(serde_json::Map<String, Value>),
}

/// One test vector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TestVector {
    /// Call arguments
    pub args: VectorArgs,
    /// Value the function must return; `None` when the key is absent and
    /// `Some(Value::Null)` for an explicit `null`
    #[serde(default, alias = "output", deserialize_with = "present_value")]
    pub expected_output: Option<Value>,
    /// The call must raise instead of returning
    #[serde(default)]
    pub expects_error: bool,
}

impl TestVector {
    /// Argument values in declaration order.
    ///
    /// # Errors
    ///
    /// Returns a reason when the values do not match `arguments`.
    pub fn ordered_args<'v>(&'v self, arguments: &[Argument]) -> Result<Vec<&'v Value>, String> {
        match &self.args {
            VectorArgs::Positional(values) => {
                if values.len() != arguments.len() {
                    return Err(format!(
                        "expected {} arguments, got {}",
                        arguments.len(),
                        values.len()
                    ));
                }
                Ok(values.iter().collect())
            }
            VectorArgs::Named(map) => {
                if let Some(unknown) =
                    map.keys().find(|key| !arguments.iter().any(|arg| &arg.name == *key))
                {
                    return Err(format!("unknown argument '{unknown}'"));
                }
                arguments
                    .iter()
                    .map(|arg| {
                        map.get(&arg.name).ok_or_else(|| format!("missing argument '{}'", arg.name))
                    })
                    .collect()
            }
        }
    }
}

/// A key that is present maps to `Some`, even when its value is `null`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Read and check a vector file.
///
/// # Errors
///
/// - [`UdfError::TestVectorsNotFound`] if `path` does not exist
/// - [`UdfError::InvalidTestVectors`] for malformed JSON, an empty list, or a
///   vector with neither an expected output nor `expects_error` (unless
///   `all_raise` marks every vector of the file as raising)
pub fn load_vectors(function: &str, path: &Path, all_raise: bool) -> Result<Vec<TestVector>> {
    let invalid = |reason: String| UdfError::InvalidTestVectors {
        path: path.display().to_string(),
        reason,
    };

    if !path.is_file() {
        return Err(UdfError::TestVectorsNotFound {
            function: function.to_string(),
            path: path.display().to_string(),
        }
        .into());
    }
    let content = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let vectors: Vec<TestVector> =
        serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;

    if vectors.is_empty() {
        return Err(invalid("the file contains no test vectors".to_string()).into());
    }
    if !all_raise
        && let Some(index) =
            vectors.iter().position(|v| !v.expects_error && v.expected_output.is_none())
    {
        return Err(invalid(format!(
            "vector {index} has no expected output and does not declare expects_error"
        ))
        .into());
    }

    tracing::debug!("Loaded {} test vectors from {}", vectors.len(), path.display());
    Ok(vectors)
}

/// Whether values of this declared type are used without a cast.
fn is_any_type(ty: &str) -> bool {
    let ty = ty.trim();
    ty.eq_ignore_ascii_case("any type") || ty.eq_ignore_ascii_case("any")
}

/// A JSON value as a SQL literal of type `ty`.
///
/// Typed values are cast from a double-quoted string; `ANY TYPE` values are
/// used as written, with strings quoted.
#[must_use]
pub fn sql_literal(value: &Value, ty: &str) -> String {
    if is_any_type(ty) {
        return match value {
            Value::Null => "NULL".to_string(),
            Value::String(s) => quote(s),
            other => other.to_string(),
        };
    }
    match value {
        Value::Null => format!("cast(NULL as {ty})"),
        Value::String(s) => format!("cast({} as {ty})", quote(s)),
        other => format!("cast({} as {ty})", quote(&other.to_string())),
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}
