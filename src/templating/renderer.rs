//! Template rendering engine with Tera.

use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;
use strsim::levenshtein;
use tera::{Context as TeraContext, Tera};

use super::error::{ErrorLocation, TemplateError};
use super::{ReferenceResolver, TemplateSet};
use crate::constants::MAX_NAME_SUGGESTIONS;
use crate::core::{FunctionKind, Params, RenderMode, UdfError};
use crate::definition::FunctionDefinition;
use crate::references;

/// Maximum allowed Levenshtein distance as a percentage of target length for suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Lines shown on each side of a failing line.
const CONTEXT_RADIUS: usize = 3;

static MISSING_VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Variable `([^`]+)` not found").expect("variable pattern is valid")
});

static PARSE_POSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-->\s*(\d+):(\d+)").expect("position pattern is valid"));

/// Renders definitions into statements using a [`TemplateSet`].
///
/// The renderer holds only template sources. Everything a render depends on
/// (definition, mode, parameters, reference resolver) is passed per call, so
/// equal inputs always produce equal text.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    templates: TemplateSet,
}

impl TemplateRenderer {
    /// Create a renderer over `templates`.
    #[must_use]
    pub fn new(templates: TemplateSet) -> Self {
        Self {
            templates,
        }
    }

    /// The templates this renderer selects from.
    #[must_use]
    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Render `definition` as a complete statement.
    ///
    /// # Errors
    ///
    /// - [`UdfError::Template`] when the code or the kind template fails to
    ///   render, when the kind template needs a field the definition lacks, or
    ///   when a permanent statement is requested for a definition without a
    ///   namespace
    /// - any error returned by `resolver`, unchanged
    pub fn render(
        &self,
        definition: &FunctionDefinition,
        mode: RenderMode,
        params: &Params,
        resolver: &mut dyn ReferenceResolver,
    ) -> Result<String> {
        let template_name = definition.kind.template_name(mode);
        let fail = |source: TemplateError| -> anyhow::Error {
            UdfError::Template {
                name: definition.name.clone(),
                source,
            }
            .into()
        };

        let template = self.templates.get(&template_name).map_err(fail)?;

        let function_name = match mode {
            RenderMode::Temporary => definition.bare_name(),
            RenderMode::Permanent => definition.qualified_name().ok_or_else(|| {
                fail(TemplateError::MissingField {
                    field: "project".to_string(),
                    template: template_name.clone(),
                })
            })?,
        };
        if definition.kind == FunctionKind::Script && definition.output.is_none() {
            return Err(fail(TemplateError::MissingField {
                field: "output".to_string(),
                template: template_name,
            }));
        }

        let code = self.render_code(definition, params, resolver)?;

        tracing::debug!("Rendering '{}' with {}", definition.name, template_name);
        let mut context = TeraContext::new();
        context.insert("name", &definition.name);
        context.insert("kind", definition.kind.as_str());
        context.insert("function_name", &function_name);
        context.insert("qualified_name", &definition.qualified_name());
        context.insert("description", &definition.description);
        context.insert("project", &definition.namespace.as_ref().map(|ns| &ns.project));
        context.insert("dataset", &definition.namespace.as_ref().map(|ns| &ns.dataset));
        context.insert("arguments", &definition.arguments);
        context.insert("output", &definition.output);
        context.insert("returns", &return_type(definition));
        context.insert("code", &code);
        context.insert("library", &definition.library);
        context.insert("params", params);

        let statement = render_text(template, &template_name, &context).map_err(fail)?;
        Ok(statement.trim_end().to_string())
    }

    /// Stage one: resolve reference markers, then render the code body with `params`.
    ///
    /// # Errors
    ///
    /// Fails like [`render`](Self::render) for the code body.
    pub fn render_code(
        &self,
        definition: &FunctionDefinition,
        params: &Params,
        resolver: &mut dyn ReferenceResolver,
    ) -> Result<String> {
        let substituted =
            references::substitute(&definition.code, |reference| resolver.resolve(reference))?;
        let label = format!("code of {}", definition.name);
        let code = render_text(&substituted, &label, &params_context(params)).map_err(|source| {
            UdfError::Template {
                name: definition.name.clone(),
                source,
            }
        })?;
        Ok(code.trim_end().to_string())
    }
}

/// Render one templated definition field (such as `project`) with `params`.
///
/// # Errors
///
/// Returns [`UdfError::Template`] naming `name` when the field fails to render.
pub fn render_field(name: &str, field: &str, text: &str, params: &Params) -> Result<String> {
    let label = format!("{field} of {name}");
    render_text(text, &label, &params_context(params)).map_err(|source| {
        UdfError::Template {
            name: name.to_string(),
            source,
        }
        .into()
    })
}

/// Output type for a `RETURNS` clause; `ANY TYPE` outputs are inferred by the engine.
fn return_type(definition: &FunctionDefinition) -> Option<&str> {
    definition
        .output
        .as_ref()
        .map(|output| output.ty.as_str())
        .filter(|ty| !ty.trim().eq_ignore_ascii_case("any type"))
}

/// Parameters as top-level variables and under `params`.
fn params_context(params: &Params) -> TeraContext {
    let mut context = TeraContext::new();
    for (key, value) in params {
        context.insert(key.as_str(), value);
    }
    context.insert("params", params);
    context
}

fn render_text(source: &str, label: &str, context: &TeraContext) -> Result<String, TemplateError> {
    // Fresh instance per render, autoescaping off: the output is SQL, not HTML.
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.render_str(source, context).map_err(|e| parse_tera_error(&e, source, label, context))
}

/// Parse a Tera error into a structured [`TemplateError`].
fn parse_tera_error(
    error: &tera::Error,
    source: &str,
    label: &str,
    context: &TeraContext,
) -> TemplateError {
    let messages = error_chain(error);
    let joined = messages.join("\n");

    let line_number = PARSE_POSITION
        .captures(&joined)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok());
    let location = Box::new(ErrorLocation {
        template: label.to_string(),
        line_number,
        context_lines: line_number
            .map(|line| extract_context_lines(source, line, CONTEXT_RADIUS))
            .unwrap_or_default(),
    });

    if let Some(variable) = MISSING_VARIABLE
        .captures(&joined)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
    {
        let available_variables = available_variables(context);
        let suggestions = find_similar_variables(&variable, &available_variables);
        return TemplateError::VariableNotFound {
            variable,
            available_variables,
            suggestions,
            location,
        };
    }

    TemplateError::SyntaxError {
        message: format_tera_messages(&messages),
        location,
    }
}

/// Messages of `error` and all of its sources, outermost first.
fn error_chain(error: &tera::Error) -> Vec<String> {
    use std::error::Error;

    let mut messages = vec![error.to_string()];
    let mut current: Option<&dyn Error> = error.source();
    while let Some(err) = current {
        messages.push(err.to_string());
        current = err.source();
    }
    messages
}

/// Drop Tera's internal one-off template name and the generic wrapper messages.
fn format_tera_messages(messages: &[String]) -> String {
    let cleaned: Vec<String> = messages
        .iter()
        .map(|msg| {
            msg.replace("while rendering '__tera_one_off'", "")
                .replace("Failed to render '__tera_one_off'", "")
                .replace("Failed to parse '__tera_one_off'", "")
                .replace("'__tera_one_off'", "template")
                .trim()
                .to_string()
        })
        .filter(|msg| !msg.is_empty())
        .collect();

    if cleaned.is_empty() {
        "Template syntax error".to_string()
    } else {
        cleaned.join("\n  → ")
    }
}

fn available_variables(context: &TeraContext) -> Vec<String> {
    match context.clone().into_json() {
        serde_json::Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Find similar variable names using Levenshtein distance.
fn find_similar_variables(target: &str, available: &[String]) -> Vec<String> {
    let mut scored: Vec<_> =
        available.iter().map(|var| (var.clone(), levenshtein(target, var))).collect();
    scored.sort_by_key(|(_, dist)| *dist);

    let threshold = (target.len() * SIMILARITY_THRESHOLD_PERCENT / 100).max(1);
    scored
        .into_iter()
        .filter(|(_, dist)| *dist <= threshold)
        .take(MAX_NAME_SUGGESTIONS)
        .map(|(var, _)| var)
        .collect()
}

/// Lines around `error_line` (1-based), each with its 1-based number.
fn extract_context_lines(
    content: &str,
    error_line: usize,
    context_size: usize,
) -> Vec<(usize, String)> {
    let lines: Vec<&str> = content.lines().collect();
    if error_line == 0 || error_line > lines.len() {
        return Vec::new();
    }

    let start = error_line.saturating_sub(context_size + 1);
    let end = (error_line + context_size).min(lines.len());
    lines[start..end]
        .iter()
        .enumerate()
        .map(|(idx, line)| (start + idx + 1, (*line).to_string()))
        .collect()
}
