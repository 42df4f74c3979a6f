//! Function kinds and render modes.
//!
//! A [`FunctionKind`] selects the template family a definition is rendered
//! with. Each family has a permanent template (fully-qualified, persisted) and
//! a temporary one (bare name, session scoped), chosen by [`RenderMode`].
//!
//! ```rust
//! use udfkit::core::{FunctionKind, RenderMode};
//!
//! let kind: FunctionKind = "function_sql".parse().unwrap();
//! assert_eq!(kind, FunctionKind::Scalar);
//! assert_eq!(kind.template_name(RenderMode::Permanent), "function_sql.sql");
//! assert_eq!(kind.template_name(RenderMode::Temporary), "temp_function_sql.sql");
//! ```

use serde::{Deserialize, Serialize};

use super::UdfError;

/// Template family of a declared function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    /// SQL expression function (`function_sql`)
    #[serde(rename = "function_sql")]
    Scalar,

    /// JavaScript function (`function_js`)
    #[serde(rename = "function_js")]
    Script,

    /// Stored procedure (`procedure`)
    #[serde(rename = "procedure")]
    Procedure,
}

impl FunctionKind {
    /// All kinds, in declaration order.
    pub const ALL: [FunctionKind; 3] =
        [FunctionKind::Scalar, FunctionKind::Script, FunctionKind::Procedure];

    /// The value used in definition files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FunctionKind::Scalar => "function_sql",
            FunctionKind::Script => "function_js",
            FunctionKind::Procedure => "procedure",
        }
    }

    /// File name of the template for this kind in the given mode.
    #[must_use]
    pub fn template_name(&self, mode: RenderMode) -> String {
        match mode {
            RenderMode::Permanent => format!("{}.sql", self.as_str()),
            RenderMode::Temporary => format!("temp_{}.sql", self.as_str()),
        }
    }

    /// Whether functions of this kind can be called inside a `select`.
    ///
    /// Procedures are invoked with `CALL` and return no value, so they have no
    /// comparison-table verification.
    #[must_use]
    pub const fn is_callable_in_select(&self) -> bool {
        !matches!(self, FunctionKind::Procedure)
    }
}

impl std::fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FunctionKind {
    type Err = UdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "function_sql" | "sql" | "scalar" => Ok(FunctionKind::Scalar),
            "function_js" | "js" | "script" => Ok(FunctionKind::Script),
            "procedure" => Ok(FunctionKind::Procedure),
            _ => Err(UdfError::UnsupportedKind {
                kind: s.to_string(),
            }),
        }
    }
}

/// Which template variant to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Persisted deployment form; references are fully qualified.
    Permanent,
    /// Session-scoped form used for verification; references are bare names.
    Temporary,
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderMode::Permanent => f.write_str("permanent"),
            RenderMode::Temporary => f.write_str("temporary"),
        }
    }
}
