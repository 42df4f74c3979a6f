//! Structured template errors.
//!
//! Rendering happens in two places: a function's code body (with caller
//! parameters and resolved references) and the kind template that embeds it.
//! [`ErrorLocation`] records which of the two failed so messages can point at
//! the right text.

use thiserror::Error;

/// Template rendering failures with enough context to fix them.
#[derive(Debug, Clone, Error)]
pub enum TemplateError {
    /// A `{{ variable }}` had no value in the parameters or definition fields.
    #[error("Template variable not found: '{variable}'")]
    VariableNotFound {
        variable: String,
        available_variables: Vec<String>,
        suggestions: Vec<String>,
        location: Box<ErrorLocation>,
    },

    /// The template text could not be parsed or evaluated.
    #[error("Template syntax error: {message}")]
    SyntaxError {
        message: String,
        location: Box<ErrorLocation>,
    },

    /// The kind template needs a field the definition does not declare.
    #[error("Field '{field}' is required by the {template} template")]
    MissingField {
        field: String,
        template: String,
    },

    /// No template with this name is available.
    #[error("Template '{name}' is not available")]
    UnknownTemplate {
        name: String,
    },
}

/// Where a template error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    /// What was being rendered, e.g. "code of add" or "function_sql.sql"
    pub template: String,
    /// 1-based line number if Tera reported one
    pub line_number: Option<usize>,
    /// Lines around the error, with their 1-based numbers
    pub context_lines: Vec<(usize, String)>,
}

impl TemplateError {
    /// Multi-line, user-facing description of the error.
    #[must_use]
    pub fn format_with_context(&self) -> String {
        match self {
            TemplateError::VariableNotFound {
                variable,
                available_variables,
                suggestions,
                location,
            } => format_variable_not_found(variable, available_variables, suggestions, location),
            TemplateError::SyntaxError {
                message,
                location,
            } => format_syntax_error(message, location),
            TemplateError::MissingField {
                field,
                template,
            } => format!(
                "The {template} template uses '{field}', but the definition does not declare it.\n"
            ),
            TemplateError::UnknownTemplate {
                name,
            } => format!(
                "No built-in or configured template is named '{name}'.\n\
                 Override templates must use one of the six standard file names.\n"
            ),
        }
    }
}

fn format_variable_not_found(
    variable: &str,
    available_variables: &[String],
    suggestions: &[String],
    location: &ErrorLocation,
) -> String {
    let mut msg = String::new();
    msg.push_str(&format!("Variable: {variable}\n"));
    msg.push_str(&format!("In: {}\n", location.template));
    if let Some(line) = location.line_number {
        msg.push_str(&format!("Line: {line}\n"));
    }
    push_context_lines(&mut msg, location);

    if !suggestions.is_empty() {
        msg.push_str("Did you mean one of these?\n");
        for suggestion in suggestions {
            msg.push_str(&format!("  - {suggestion}\n"));
        }
    }

    if available_variables.is_empty() {
        msg.push_str("No parameters were supplied; pass them with --env or --param key=value\n");
    } else {
        msg.push_str(&format!("Available variables: {}\n", available_variables.join(", ")));
    }
    msg
}

fn format_syntax_error(message: &str, location: &ErrorLocation) -> String {
    let mut msg = String::new();
    msg.push_str(&format!("Error: {message}\n"));
    msg.push_str(&format!("In: {}\n", location.template));
    if let Some(line) = location.line_number {
        msg.push_str(&format!("Line: {line}\n"));
    }
    push_context_lines(&mut msg, location);
    msg.push_str("Common issues:\n");
    msg.push_str("  - Unclosed {{ }} or {% %} delimiters\n");
    msg.push_str("  - Invalid filter names\n");
    msg.push_str("  - Missing quotes around string values\n");
    msg
}

fn push_context_lines(msg: &mut String, location: &ErrorLocation) {
    if location.context_lines.is_empty() {
        return;
    }
    msg.push('\n');
    for (number, line) in &location.context_lines {
        let marker = if Some(*number) == location.line_number {
            ">"
        } else {
            " "
        };
        msg.push_str(&format!("{marker} {number:>4} | {line}\n"));
    }
    msg.push('\n');
}
