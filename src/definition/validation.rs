//! Structural validation of definition files and of the whole store.
//!
//! Each file is checked against a rule tree describing the expected shape:
//! which keys are required, what type each value has, and which values an
//! enumerated field accepts. Problems are collected rather than returned on
//! the first hit, with paths such as `.arguments[1].type`.
//!
//! Store-wide validation adds the graph checks: references to undeclared
//! functions and reference cycles.

use anyhow::Result;
use serde::Serialize;
use serde_yaml::Value;
use std::fmt;

use super::DefinitionStore;
use crate::core::FunctionKind;
use crate::resolver::{DanglingReference, DependencyGraph};

/// Expected type of a value.
#[derive(Debug, Clone)]
enum Rule {
    Str {
        valid_values: &'static [&'static str],
    },
    Bool,
    Int,
    List(Box<Rule>),
    Map(Vec<Attribute>),
}

#[derive(Debug, Clone)]
struct Attribute {
    key: &'static str,
    required: bool,
    rule: Rule,
}

const fn str_rule() -> Rule {
    Rule::Str {
        valid_values: &[],
    }
}

fn attr(key: &'static str, required: bool, rule: Rule) -> Attribute {
    Attribute {
        key,
        required,
        rule,
    }
}

impl Rule {
    fn type_name(&self) -> &'static str {
        match self {
            Rule::Str {
                ..
            } => "string",
            Rule::Bool => "bool",
            Rule::Int => "int",
            Rule::List(_) => "list",
            Rule::Map(_) => "map",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Rule::Str {
                ..
            } => value.is_string(),
            Rule::Bool => value.is_bool(),
            Rule::Int => value.as_u64().is_some() || value.as_i64().is_some(),
            Rule::List(_) => value.is_sequence(),
            Rule::Map(_) => value.is_mapping(),
        }
    }
}

fn yaml_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "map",
        Value::Tagged(_) => "tagged",
    }
}

const KIND_NAMES: &[&str] = &["function_sql", "function_js", "procedure"];

/// Rules for one definition file. `output` is required unless the file
/// declares a procedure.
fn definition_rules(is_procedure: bool) -> Rule {
    let name_and_type = || Rule::Map(vec![attr("name", true, str_rule()), attr("type", true, str_rule())]);
    Rule::Map(vec![
        attr(
            "type",
            true,
            Rule::Str {
                valid_values: KIND_NAMES,
            },
        ),
        attr("description", true, str_rule()),
        attr("project", true, str_rule()),
        attr("dataset", true, str_rule()),
        attr("code", true, str_rule()),
        attr("arguments", false, Rule::List(Box::new(name_and_type()))),
        attr("output", !is_procedure, name_and_type()),
        attr(
            "tests",
            false,
            Rule::List(Box::new(Rule::Map(vec![
                attr("file", true, str_rule()),
                attr("throws_exception", false, Rule::Bool),
                attr("error_code", false, Rule::Int),
            ]))),
        ),
        attr("library", false, Rule::List(Box::new(str_rule()))),
    ])
}

/// A value of the wrong type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidType {
    /// Path of the value, e.g. `.output.name`
    pub path: String,
    /// Expected type
    pub expected: String,
    /// Type found
    pub actual: String,
}

/// A value outside an enumerated set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidValue {
    /// Path of the value
    pub path: String,
    /// Accepted values
    pub valid_values: Vec<String>,
    /// Value found
    pub actual: String,
}

/// Problems found in one definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Required keys that are absent
    pub missing_keys: Vec<String>,
    /// Values of the wrong type
    pub invalid_types: Vec<InvalidType>,
    /// Values outside their enumerated set
    pub invalid_values: Vec<InvalidValue>,
}

impl ValidationReport {
    /// Whether the file passed every check.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.missing_keys.is_empty() && self.invalid_types.is_empty() && self.invalid_values.is_empty()
    }

    /// Human-readable problem lines.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        let missing = self.missing_keys.iter().map(|key| format!("missing key {key}"));
        let types = self.invalid_types.iter().map(|t| {
            format!("invalid type at {}: expected {}, got {}", t.path, t.expected, t.actual)
        });
        let values = self.invalid_values.iter().map(|v| {
            format!(
                "invalid value at {}: expected one of [{}], got '{}'",
                v.path,
                v.valid_values.join(", "),
                v.actual
            )
        });
        missing.chain(types).chain(values).collect()
    }
}

/// Validate one parsed definition document.
#[must_use]
pub fn validate_definition(document: &Value) -> ValidationReport {
    let is_procedure = document.get("type").and_then(Value::as_str) == Some(FunctionKind::Procedure.as_str());
    let mut report = ValidationReport::default();
    check(document, &definition_rules(is_procedure), "", &mut report);
    report
}

fn check(value: &Value, rule: &Rule, path: &str, report: &mut ValidationReport) {
    match rule {
        Rule::Str {
            valid_values,
        } if !valid_values.is_empty() => {
            if let Some(text) = value.as_str()
                && !valid_values.contains(&text)
            {
                report.invalid_values.push(InvalidValue {
                    path: path.to_string(),
                    valid_values: valid_values.iter().map(ToString::to_string).collect(),
                    actual: text.to_string(),
                });
            }
        }
        Rule::Map(attributes) => {
            for attribute in attributes {
                let child_path = format!("{path}.{}", attribute.key);
                match value.get(attribute.key) {
                    None => {
                        if attribute.required {
                            report.missing_keys.push(child_path);
                        }
                    }
                    Some(child) if !attribute.rule.matches(child) => {
                        report.invalid_types.push(InvalidType {
                            path: child_path,
                            expected: attribute.rule.type_name().to_string(),
                            actual: yaml_type_name(child).to_string(),
                        });
                    }
                    Some(child) => check(child, &attribute.rule, &child_path, report),
                }
            }
        }
        Rule::List(item_rule) => {
            for (i, item) in value.as_sequence().into_iter().flatten().enumerate() {
                let item_path = format!("{path}[{i}]");
                if item_rule.matches(item) {
                    check(item, item_rule, &item_path, report);
                } else {
                    report.invalid_types.push(InvalidType {
                        path: item_path,
                        expected: item_rule.type_name().to_string(),
                        actual: yaml_type_name(item).to_string(),
                    });
                }
            }
        }
        _ => {}
    }
}

/// Validation results for a whole store.
#[derive(Debug, Default)]
pub struct StoreValidation {
    /// Per-file reports that found problems, by function name
    pub files: Vec<(String, ValidationReport)>,
    /// Files that could not be parsed at all
    pub unreadable: Vec<(String, String)>,
    /// References to undeclared functions
    pub dangling: Vec<DanglingReference>,
    /// Reference cycles, each closed by repeating its first name
    pub cycles: Vec<Vec<String>>,
}

impl StoreValidation {
    /// Whether the store passed every check.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.files.is_empty()
            && self.unreadable.is_empty()
            && self.dangling.is_empty()
            && self.cycles.is_empty()
    }

    /// Number of problems found.
    #[must_use]
    pub fn problem_count(&self) -> usize {
        self.files.iter().map(|(_, r)| r.messages().len()).sum::<usize>()
            + self.unreadable.len()
            + self.dangling.len()
            + self.cycles.len()
    }
}

impl fmt::Display for StoreValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, reason) in &self.unreadable {
            writeln!(f, "{name}: {reason}")?;
        }
        for (name, report) in &self.files {
            for message in report.messages() {
                writeln!(f, "{name}: {message}")?;
            }
        }
        for dangling in &self.dangling {
            writeln!(f, "{}: references undeclared function '{}'", dangling.from, dangling.to)?;
        }
        for cycle in &self.cycles {
            writeln!(f, "circular reference: {}", cycle.join(" → "))?;
        }
        Ok(())
    }
}

/// Validate every file of `store`, then its reference graph.
///
/// # Errors
///
/// Only fails when the graph itself cannot be built; problems in individual
/// files are collected in the result.
pub fn validate_store(store: &DefinitionStore) -> Result<StoreValidation> {
    let mut result = StoreValidation::default();
    let mut all_readable = true;

    for name in store.names() {
        match store.load_value(&name) {
            Ok(document) => {
                let report = validate_definition(&document);
                if !report.is_valid() {
                    tracing::debug!("{} has {} problem(s)", name, report.messages().len());
                    result.files.push((name, report));
                }
            }
            Err(e) => {
                all_readable = false;
                result.unreadable.push((name, e.to_string()));
            }
        }
    }

    if all_readable {
        let graph = DependencyGraph::from_store(store)?;
        result.dangling = graph.dangling_references().to_vec();
        result.cycles = graph.find_cycles();
    } else {
        tracing::warn!("Skipping reference checks: some definitions could not be parsed");
    }

    Ok(result)
}
