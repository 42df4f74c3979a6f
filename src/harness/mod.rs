//! Verification statements built from test vectors.
//!
//! For each test vector file a definition declares, the harness produces:
//!
//! - a **comparison** statement: the temporary composition of the function,
//!   a literal table `test_cte_<name>` with one row per vector, and a final
//!   select returning the rows where the function disagrees with the expected
//!   output. The comparison is NULL-safe, so a NULL result only matches a
//!   NULL expectation. Any returned row is a mismatch.
//! - one **error probe** per vector expected to raise (every vector of a file
//!   declared with `throws_exception: true`, or a vector with
//!   `expects_error: true`): the temporary composition followed by a direct
//!   call with the vector's arguments. The probe passes only when the executor
//!   rejects it with the expected client error code.
//!
//! ```sql
//! -- Test for add
//! CREATE TEMP FUNCTION `add`(x INT64, y INT64)
//! RETURNS INT64
//! AS (
//! x + y
//! );
//! with test_cte_add as (
//! select cast("2" as INT64) as x, cast("3" as INT64) as y, cast("5" as INT64) as total
//! 	union all select cast("0" as INT64) as x, cast("0" as INT64) as y, cast("0" as INT64) as total
//! )
//! select *, `add`(x, y) as result from test_cte_add
//! where total is distinct from `add`(x, y);
//! ```
//!
//! Test cases are enumerated up front into a plain list and evaluated by
//! [`run_tests`].

mod runner;
pub mod vectors;

pub use runner::{CheckResult, Outcome, TestReport, run_tests};
pub use vectors::{TestVector, VectorArgs, load_vectors};

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::core::{Params, UdfError};
use crate::definition::{FunctionDefinition, Output, TestRef};
use crate::resolver::{Composer, ResolutionState};
use vectors::sql_literal;

/// A direct call expected to raise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorProbe {
    /// Position of the vector in its file
    pub index: usize,
    /// Client error code the executor must report
    pub expected_code: u16,
    /// Composition plus the call
    pub statement: String,
}

/// Everything needed to check one test vector file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Function under test
    pub function: String,
    /// Vector file the checks were built from
    pub vector_file: PathBuf,
    /// Mismatch query over the vectors with an expected output
    pub comparison: Option<String>,
    /// Calls over the vectors expected to raise
    pub error_probes: Vec<ErrorProbe>,
}

impl Verification {
    /// Number of executor round trips needed.
    #[must_use]
    pub fn check_count(&self) -> usize {
        usize::from(self.comparison.is_some()) + self.error_probes.len()
    }
}

/// One enumerated test: a function and one of its vector files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// `function::file_stem`
    pub id: String,
    /// Function under test
    pub function: String,
    /// Statements to run
    pub verification: Verification,
}

/// Build the checks for one declared test file of `definition`.
///
/// # Errors
///
/// - [`UdfError::InvalidDefinition`] for procedures and functions without an
///   output
/// - [`UdfError::TestVectorsNotFound`] / [`UdfError::InvalidTestVectors`]
/// - any composition error of the function or its dependencies
pub fn build_verification(
    composer: &Composer<'_>,
    definition: &FunctionDefinition,
    test: &TestRef,
    params: &Params,
) -> Result<Verification> {
    let output = verifiable_output(definition)?;
    let path = definition.test_path(test);
    let vectors = load_vectors(&definition.name, &path, test.throws_exception)?;
    let (composition, _) =
        composer.compose_temporary(&definition.name, params, ResolutionState::new())?;

    let (raising, returning): (Vec<_>, Vec<_>) = vectors
        .iter()
        .enumerate()
        .partition(|(_, vector)| test.throws_exception || vector.expects_error);

    let comparison = if returning.is_empty() {
        None
    } else {
        let rows = returning
            .iter()
            .map(|(index, vector)| table_row(definition, output, vector, *index, &path))
            .collect::<Result<Vec<_>>>()?;
        Some(comparison_statement(definition, output, &composition, &rows))
    };

    let error_probes = raising
        .iter()
        .map(|(index, vector)| {
            let args = typed_args(definition, vector, *index, &path)?;
            Ok(ErrorProbe {
                index: *index,
                expected_code: test.error_code,
                statement: format!(
                    "-- Error probe {index} for {name}\n{composition}\nselect {call}({args});\n",
                    name = definition.name,
                    call = definition.bare_name(),
                    args = args.join(", "),
                ),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Verification {
        function: definition.name.clone(),
        vector_file: path,
        comparison,
        error_probes,
    })
}

/// The comparison statement over every vector in `vector_file` that has an
/// expected output.
///
/// # Errors
///
/// Fails like [`build_verification`], and with
/// [`UdfError::InvalidTestVectors`] when every vector expects an error.
pub fn build_verification_statement(
    composer: &Composer<'_>,
    definition: &FunctionDefinition,
    vector_file: &Path,
    params: &Params,
) -> Result<String> {
    let test = TestRef {
        file: vector_file.display().to_string(),
        throws_exception: false,
        error_code: crate::constants::DEFAULT_EXPECTED_ERROR_CODE,
    };
    build_verification(composer, definition, &test, params)?.comparison.ok_or_else(|| {
        UdfError::InvalidTestVectors {
            path: vector_file.display().to_string(),
            reason: "every vector expects an error; there is nothing to compare".to_string(),
        }
        .into()
    })
}

/// Enumerate one test case per declared vector file of each function in
/// `names`, in order.
///
/// # Errors
///
/// Fails on the first definition or vector file that cannot be turned into
/// checks.
pub fn enumerate_tests(
    composer: &Composer<'_>,
    names: &[String],
    params: &Params,
) -> Result<Vec<TestCase>> {
    let mut cases = Vec::new();
    for name in names {
        let definition = composer.store().load(name, params)?;
        for test in &definition.tests {
            let verification = build_verification(composer, &definition, test, params)?;
            let stem = Path::new(&test.file)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(test.file.as_str())
                .to_string();
            cases.push(TestCase {
                id: format!("{name}::{stem}"),
                function: name.clone(),
                verification,
            });
        }
    }
    tracing::debug!("Enumerated {} test cases", cases.len());
    Ok(cases)
}

fn verifiable_output(definition: &FunctionDefinition) -> Result<&Output> {
    let invalid = |reason: &str| UdfError::InvalidDefinition {
        name: definition.name.clone(),
        reason: reason.to_string(),
    };
    if !definition.kind.is_callable_in_select() {
        return Err(invalid("procedures cannot be verified with test vectors").into());
    }
    definition
        .output
        .as_ref()
        .ok_or_else(|| invalid("functions with test vectors must declare an output").into())
}

fn typed_args(
    definition: &FunctionDefinition,
    vector: &TestVector,
    index: usize,
    path: &Path,
) -> Result<Vec<String>> {
    let values = vector.ordered_args(&definition.arguments).map_err(|reason| {
        UdfError::InvalidTestVectors {
            path: path.display().to_string(),
            reason: format!("vector {index}: {reason}"),
        }
    })?;
    Ok(values.iter().zip(&definition.arguments).map(|(value, arg)| sql_literal(value, &arg.ty)).collect())
}

fn table_row(
    definition: &FunctionDefinition,
    output: &Output,
    vector: &TestVector,
    index: usize,
    path: &Path,
) -> Result<String> {
    let mut columns: Vec<String> = typed_args(definition, vector, index, path)?
        .into_iter()
        .zip(&definition.arguments)
        .map(|(literal, arg)| format!("{literal} as {}", arg.name))
        .collect();
    let expected = vector.expected_output.as_ref().unwrap_or(&serde_json::Value::Null);
    columns.push(format!("{} as {}", sql_literal(expected, &output.ty), output.name));
    Ok(format!("select {}", columns.join(", ")))
}

fn comparison_statement(
    definition: &FunctionDefinition,
    output: &Output,
    composition: &str,
    rows: &[String],
) -> String {
    let name = &definition.name;
    let call = format!(
        "{}({})",
        definition.bare_name(),
        definition.arguments.iter().map(|arg| arg.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    format!(
        "-- Test for {name}\n\
         {composition}\n\
         with test_cte_{name} as (\n\
         {rows}\n\
         )\n\
         select *, {call} as result from test_cte_{name}\n\
         where {output} is distinct from {call};\n",
        rows = rows.join("\n\tunion all "),
        output = output.name,
    )
}
