//! Reference marker extraction.
//!
//! A function's code names the functions it depends on with reference markers:
//!
//! ```text
//! {{ ref("normalize_email") }}(email)
//! {{ ref('to_cents', env="prod") }}(amount)
//! ```
//!
//! The first argument is the referenced function's name. Optional `key="value"`
//! pairs override the caller's parameters when the referenced definition's
//! namespace is rendered.
//!
//! [`extract`] returns the referenced names in first-occurrence order with
//! duplicates removed. It does not check that the names are declared; loading
//! an undeclared name fails later with `DefinitionNotFound`.

use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use crate::core::Params;

static REFERENCE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{\{\s*ref\s*\(\s*(?:"([^"]+)"|'([^']+)')\s*(?:,\s*(?P<extra>[^)]*?))?\s*\)\s*\}\}"#,
    )
    .expect("reference marker pattern is valid")
});

static OVERRIDE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\w+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("override pattern is valid")
});

/// One reference marker occurrence in a code body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Referenced function name
    pub name: String,
    /// Parameter overrides given after the name
    pub overrides: Params,
    /// Byte range of the whole marker, braces included
    pub span: Range<usize>,
}

/// Referenced names in order of first occurrence, without duplicates.
#[must_use]
pub fn extract(code: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    extract_references(code)
        .into_iter()
        .map(|reference| reference.name)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Every marker occurrence in `code`, in textual order.
#[must_use]
pub fn extract_references(code: &str) -> Vec<Reference> {
    REFERENCE_MARKER
        .captures_iter(code)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1).or_else(|| caps.get(2))?.as_str().trim().to_string();
            let overrides = caps.name("extra").map(|m| parse_overrides(m.as_str())).unwrap_or_default();
            Some(Reference {
                name,
                overrides,
                span: whole.range(),
            })
        })
        .collect()
}

fn parse_overrides(extra: &str) -> Params {
    let overrides: Params = OVERRIDE_PAIR
        .captures_iter(extra)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_string();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
            Some((key, value))
        })
        .collect();
    if overrides.is_empty() && !extra.trim().is_empty() {
        tracing::warn!("Ignoring unrecognized reference arguments: {}", extra.trim());
    }
    overrides
}

/// Replace every marker in `code` with the text `resolve` returns for it.
///
/// # Errors
///
/// Returns the first error produced by `resolve`.
pub fn substitute<E>(
    code: &str,
    mut resolve: impl FnMut(&Reference) -> Result<String, E>,
) -> Result<String, E> {
    let mut result = String::with_capacity(code.len());
    let mut last = 0;
    for reference in extract_references(code) {
        result.push_str(&code[last..reference.span.start]);
        result.push_str(&resolve(&reference)?);
        last = reference.span.end;
    }
    result.push_str(&code[last..]);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_in_first_occurrence_order() {
        let code = r#"
            {{ ref("b") }}(x) + {{ref('a')}}(y) - {{ ref("b") }}(z)
        "#;
        assert_eq!(extract(code), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_extract_whitespace_variants() {
        let code = "{{   ref  (  \"spaced\"  )   }}";
        assert_eq!(extract(code), vec!["spaced".to_string()]);
    }

    #[test]
    fn test_extract_with_overrides() {
        let refs = extract_references(r#"{{ ref("rates", env="prod", region='eu') }}"#);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "rates");
        assert_eq!(refs[0].overrides.get("env").map(String::as_str), Some("prod"));
        assert_eq!(refs[0].overrides.get("region").map(String::as_str), Some("eu"));
    }

    #[test]
    fn test_no_markers() {
        assert!(extract("select 1 -- ref(\"not_a_marker\")").is_empty());
        assert!(extract("{{ env }}").is_empty());
    }

    #[test]
    fn test_substitute_replaces_all_occurrences() {
        let code = r#"{{ ref("a") }}(1) + {{ ref("b") }}(2) + {{ ref("a") }}(3)"#;
        let result =
            substitute(code, |r| Ok::<_, ()>(format!("`p`.`d`.`{}`", r.name))).unwrap();
        assert_eq!(result, "`p`.`d`.`a`(1) + `p`.`d`.`b`(2) + `p`.`d`.`a`(3)");
    }

    #[test]
    fn test_substitute_propagates_error() {
        let result = substitute(r#"{{ ref("x") }}"#, |r| Err::<String, _>(r.name.clone()));
        assert_eq!(result.unwrap_err(), "x");
    }

    #[test]
    fn test_span_covers_marker() {
        let code = r#"select {{ ref("f") }}(1)"#;
        let refs = extract_references(code);
        assert_eq!(&code[refs[0].span.clone()], r#"{{ ref("f") }}"#);
    }
}
