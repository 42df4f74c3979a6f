//! Error handling for udfkit
//!
//! This module provides the strongly-typed error enum used across the crate and
//! the user-facing [`ErrorContext`] wrapper that the binary prints.
//!
//! # Architecture
//!
//! - [`UdfError`] - every failure mode of loading, resolving, rendering,
//!   deploying and verifying function definitions
//! - [`ErrorContext`] - an error plus optional details and a suggestion
//!
//! Internal APIs return [`anyhow::Result`] and attach context with
//! `.with_context(...)`. [`user_friendly_error`] walks an [`anyhow::Error`],
//! recovers the [`UdfError`] if there is one and picks a suggestion for it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use udfkit::core::{UdfError, user_friendly_error};
//!
//! let error = UdfError::CircularDependency {
//!     chain: vec!["a".into(), "b".into(), "a".into()],
//! };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::templating::TemplateError;

/// The main error type for udfkit operations.
///
/// # Error Categories
///
/// ## Definitions
/// - [`DefinitionNotFound`] - no definition file for a name
/// - [`DefinitionParseError`] - YAML could not be parsed into a definition
/// - [`InvalidDefinition`] - parsed, but semantically unusable
/// - [`DuplicateDefinition`] - two files declare the same name
/// - [`UnsupportedKind`] - the `type` field names no known template family
///
/// ## Resolution and rendering
/// - [`CircularDependency`] - a reference cycle was found on the active path
/// - [`Template`] - rendering a code body or kind template failed
///
/// ## Verification and deployment
/// - [`TestVectorsNotFound`] - a referenced test vector file is missing
/// - [`InvalidTestVectors`] - a vector file does not match the signature
/// - [`ExecutionFailure`] - the executor rejected a statement
///
/// ## Configuration and I/O
/// - [`ConfigNotFound`], [`ConfigError`], [`FileSystemError`]
///
/// [`DefinitionNotFound`]: UdfError::DefinitionNotFound
/// [`DefinitionParseError`]: UdfError::DefinitionParseError
/// [`InvalidDefinition`]: UdfError::InvalidDefinition
/// [`DuplicateDefinition`]: UdfError::DuplicateDefinition
/// [`UnsupportedKind`]: UdfError::UnsupportedKind
/// [`CircularDependency`]: UdfError::CircularDependency
/// [`Template`]: UdfError::Template
/// [`TestVectorsNotFound`]: UdfError::TestVectorsNotFound
/// [`InvalidTestVectors`]: UdfError::InvalidTestVectors
/// [`ExecutionFailure`]: UdfError::ExecutionFailure
/// [`ConfigNotFound`]: UdfError::ConfigNotFound
/// [`ConfigError`]: UdfError::ConfigError
/// [`FileSystemError`]: UdfError::FileSystemError
#[derive(Error, Debug, Clone)]
pub enum UdfError {
    /// No definition file exists for the requested name.
    ///
    /// Raised both for top-level requests and for `ref(...)` markers that name
    /// an undeclared function.
    #[error("Function '{name}' is not defined")]
    DefinitionNotFound {
        /// The requested function name
        name: String,
        /// Declared names that are close to the requested one
        suggestions: Vec<String>,
    },

    /// A definition file exists but could not be parsed.
    #[error("Invalid definition file {file}: {reason}")]
    DefinitionParseError {
        /// Path of the definition file
        file: String,
        /// Parser message
        reason: String,
    },

    /// A definition parsed but is missing something required to use it.
    #[error("Definition '{name}' is invalid: {reason}")]
    InvalidDefinition {
        /// The function name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Two definition files share the same name.
    #[error("Function '{name}' is defined more than once: {first} and {second}")]
    DuplicateDefinition {
        /// The duplicated name
        name: String,
        /// First file declaring it
        first: String,
        /// Second file declaring it
        second: String,
    },

    /// The definition's `type` is not one of the supported template families.
    #[error("Unsupported function kind: {kind}")]
    UnsupportedKind {
        /// The unrecognized kind
        kind: String,
    },

    /// A reference cycle was detected while resolving dependencies.
    ///
    /// The chain starts and ends with the same name, e.g. `a → b → a`.
    #[error("Circular dependency detected: {}", chain.join(" → "))]
    CircularDependency {
        /// Names along the cycle, closing name repeated at the end
        chain: Vec<String>,
    },

    /// Rendering a function failed.
    #[error("Failed to render '{name}': {source}")]
    Template {
        /// The function being rendered
        name: String,
        /// Structured template failure
        #[source]
        source: TemplateError,
    },

    /// A test vector file referenced by a definition does not exist.
    #[error("Test vector file '{path}' for function '{function}' not found")]
    TestVectorsNotFound {
        /// The function declaring the test
        function: String,
        /// Resolved path of the missing file
        path: String,
    },

    /// A test vector file does not match the function signature.
    #[error("Invalid test vectors in '{path}': {reason}")]
    InvalidTestVectors {
        /// Path of the vector file
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// The executor rejected a statement during deployment or verification.
    ///
    /// Deployment is not rolled back: `deployed` lists the functions that were
    /// created before the failure and remain in place.
    #[error("Executing statement for '{name}' failed: {message}")]
    ExecutionFailure {
        /// The function whose statement failed
        name: String,
        /// Client error code when the executor classified the failure
        code: Option<u16>,
        /// Executor message
        message: String,
        /// Functions deployed earlier in the same call
        deployed: Vec<String>,
    },

    /// No `udfkit.toml` was found.
    #[error("Project file udfkit.toml not found in current directory or any parent directory")]
    ConfigNotFound,

    /// The project configuration is unusable.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// A file system operation failed.
    #[error("File system error during {operation}: {path}")]
    FileSystemError {
        /// The operation that failed (e.g. "read definition")
        operation: String,
        /// Path involved in the operation
        path: String,
    },

    /// Catch-all for errors without a dedicated variant.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// Error wrapper with a suggestion and details for CLI display.
///
/// ```rust,no_run
/// use udfkit::core::{UdfError, ErrorContext};
///
/// let context = ErrorContext::new(UdfError::ConfigNotFound)
///     .with_suggestion("Create a udfkit.toml in the project root")
///     .with_details("udfkit searches the current directory and its parents");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UdfError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    #[must_use]
    pub const fn new(error: UdfError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error (printed in green).
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error (printed in yellow).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details and suggestion to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with an actionable suggestion.
///
/// [`UdfError`] values anywhere in the chain get tailored suggestions. Other
/// errors are reported with their full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(udf_error) = error.chain().find_map(|e| e.downcast_ref::<UdfError>()) {
        let mut context = create_error_context(udf_error.clone());
        // Keep outer context messages, they usually name the command that failed
        let outer: Vec<String> = error
            .chain()
            .take_while(|e| e.downcast_ref::<UdfError>().is_none())
            .map(ToString::to_string)
            .collect();
        if !outer.is_empty() && context.details.is_none() {
            context.details = Some(outer.join(": "));
        }
        return context;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::NotFound
    {
        return ErrorContext::new(UdfError::FileSystemError {
            operation: "file access".to_string(),
            path: "unknown".to_string(),
        })
        .with_suggestion("Check that the file or directory exists and the path is correct");
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(UdfError::Other {
        message,
    })
}

fn create_error_context(error: UdfError) -> ErrorContext {
    match &error {
        UdfError::DefinitionNotFound {
            suggestions,
            ..
        } => {
            let context = ErrorContext::new(error.clone());
            if suggestions.is_empty() {
                context.with_suggestion(
                    "Run 'udfkit list' to see the declared functions, or add a <name>.yaml definition",
                )
            } else {
                context.with_suggestion(format!("Did you mean: {}?", suggestions.join(", ")))
            }
        }
        UdfError::DefinitionParseError {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Check the YAML syntax and run 'udfkit validate' for a field-by-field report"),
        UdfError::InvalidDefinition {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Run 'udfkit validate' to list every problem in the definition files"),
        UdfError::DuplicateDefinition {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Rename or remove one of the files; function names must be unique"),
        UdfError::UnsupportedKind {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Use one of: function_sql, function_js, procedure"),
        UdfError::CircularDependency {
            ..
        } => ErrorContext::new(error.clone())
            .with_details("Every function must be deployable before the functions that reference it")
            .with_suggestion("Remove one of the ref(...) markers along the cycle"),
        UdfError::Template {
            source,
            ..
        } => {
            let details = source.format_with_context();
            ErrorContext::new(error.clone())
                .with_details(details)
                .with_suggestion(
                    "Check the template syntax: parameters use {{ name }}, references use {{ ref(\"function\") }}",
                )
        }
        UdfError::TestVectorsNotFound {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Test files are resolved relative to the definition file's directory"),
        UdfError::InvalidTestVectors {
            ..
        } => ErrorContext::new(error.clone()).with_suggestion(
            "Each vector needs 'args' (list or map by argument name) and 'expected_output', or 'expects_error: true'",
        ),
        UdfError::ExecutionFailure {
            deployed,
            ..
        } => {
            let context = ErrorContext::new(error.clone());
            let context = if deployed.is_empty() {
                context
            } else {
                context.with_details(format!(
                    "Already deployed before the failure (not rolled back): {}",
                    deployed.join(", ")
                ))
            };
            context.with_suggestion("Re-run with --dry-run to inspect the generated statements")
        }
        UdfError::ConfigNotFound => ErrorContext::new(error.clone())
            .with_suggestion("Create a udfkit.toml in the project root or pass --config <path>"),
        UdfError::ConfigError {
            ..
        } => ErrorContext::new(error.clone()).with_suggestion("Check the settings in udfkit.toml"),
        UdfError::FileSystemError {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Check that the path exists and is readable"),
        UdfError::Other {
            ..
        } => ErrorContext::new(error.clone()),
    }
}
