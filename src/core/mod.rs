//! Core types shared by every udfkit module.
//!
//! - [`UdfError`] and [`ErrorContext`] for error reporting
//! - [`FunctionKind`] and [`RenderMode`] for template selection
//! - [`Params`], the caller-supplied parameter set used for rendering

pub mod error;
mod kind;

pub use error::{ErrorContext, UdfError, user_friendly_error};
pub use kind::{FunctionKind, RenderMode};

use std::collections::BTreeMap;

/// Caller-supplied rendering parameters (e.g. `env = "dev"`).
///
/// Ordered so that identical parameter sets hash and print identically.
pub type Params = BTreeMap<String, String>;

/// Parse a `key=value` pair as given on the command line.
///
/// # Errors
///
/// Returns an error if the input has no `=` or the key is empty.
pub fn parse_param(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{input}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{input}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
