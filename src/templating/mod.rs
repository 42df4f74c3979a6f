//! Two-stage statement rendering with Tera.
//!
//! # Overview
//!
//! A statement is produced from a [`FunctionDefinition`] in two stages:
//!
//! 1. **Code** - every reference marker in the code body is replaced with the
//!    answer of a [`ReferenceResolver`], then the result is rendered as a Tera
//!    template with the caller's parameters (`{{ env }}`, `{{ params.region }}`).
//! 2. **Kind template** - the rendered code and the definition fields are
//!    embedded into the template selected by `(kind, mode)`.
//!
//! # Kind Templates
//!
//! | Kind           | Permanent          | Temporary               |
//! |----------------|--------------------|-------------------------|
//! | `function_sql` | `function_sql.sql` | `temp_function_sql.sql` |
//! | `function_js`  | `function_js.sql`  | `temp_function_js.sql`  |
//! | `procedure`    | `procedure.sql`    | `temp_procedure.sql`    |
//!
//! Built-in copies ship with the crate. A project may override any of them by
//! placing a file with the same name in its configured templates directory.
//!
//! # Template Context
//!
//! Kind templates see:
//! - `name`, `kind`, `description`, `code`, `library`
//! - `function_name`: qualified name in permanent mode, bare name in temporary mode
//! - `qualified_name`, `project`, `dataset` (null without a namespace)
//! - `arguments`: list of `{name, type}`
//! - `output`: `{name, type}` or null
//! - `returns`: the output type, null when absent or `ANY TYPE`
//! - `params`: the caller's parameters
//!
//! A fresh `tera::Tera` is built for every render; no state is kept between
//! calls.
//!
//! [`FunctionDefinition`]: crate::definition::FunctionDefinition

mod error;
mod renderer;
mod templates;

pub use error::{ErrorLocation, TemplateError};
pub use renderer::{TemplateRenderer, render_field};
pub use templates::TemplateSet;

use anyhow::Result;

use crate::references::Reference;

/// Answers reference markers found in a code body.
///
/// The composer passes one per render call; permanent renders resolve to
/// qualified names and temporary renders to bare names.
pub trait ReferenceResolver {
    /// Text that replaces `reference` in the code body.
    ///
    /// # Errors
    ///
    /// Implementations fail when the referenced function cannot be loaded.
    fn resolve(&mut self, reference: &Reference) -> Result<String>;
}

/// Resolves every reference to the bare, quoted function name.
///
/// Temporary functions live in the session and are called without a
/// namespace, so no definition has to be loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct BareReferences;

impl ReferenceResolver for BareReferences {
    fn resolve(&mut self, reference: &Reference) -> Result<String> {
        Ok(format!("`{}`", reference.name))
    }
}
