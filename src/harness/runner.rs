//! Evaluating enumerated test cases against an executor.

use std::fmt;

use super::TestCase;
use crate::executor::{Executor, ExecutorError, RowSet};

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Comparison returned no rows, or the probe raised the expected error
    Passed,
    /// Comparison returned rows where the function disagrees
    Mismatch(RowSet),
    /// Probe expected to raise completed normally
    UnexpectedSuccess,
    /// Statement failed where no failure was expected
    UnexpectedError(ExecutorError),
    /// Probe raised, but not with the expected client error code
    WrongErrorClass {
        /// Expected client error code
        expected: u16,
        /// What the executor reported
        actual: ExecutorError,
    },
}

impl Outcome {
    /// Whether the check passed.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "passed"),
            Outcome::Mismatch(rows) => {
                write!(f, "{} mismatching row(s):\n{}", rows.len(), rows.format_table())
            }
            Outcome::UnexpectedSuccess => write!(f, "expected an error, but the call succeeded"),
            Outcome::UnexpectedError(e) => write!(f, "unexpected error: {e}"),
            Outcome::WrongErrorClass {
                expected,
                actual,
            } => write!(f, "expected client error {expected}, got: {actual}"),
        }
    }
}

/// Outcome of one check of one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Id of the test case
    pub case_id: String,
    /// `comparison` or `error probe <index>`
    pub check: String,
    /// What happened
    pub outcome: Outcome,
}

/// Results of a test run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestReport {
    /// One entry per check
    pub results: Vec<CheckResult>,
}

impl TestReport {
    /// Number of passing checks.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_pass()).count()
    }

    /// Number of failing checks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    /// Whether every check passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// The failing checks.
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| !r.outcome.is_pass())
    }
}

/// Run every check of `cases` sequentially.
///
/// Executor failures are recorded as outcomes rather than returned, so one
/// broken function does not hide the results of the others.
pub async fn run_tests<E: Executor>(cases: &[TestCase], executor: &E) -> TestReport {
    let mut report = TestReport::default();

    for case in cases {
        let verification = &case.verification;
        tracing::info!("Running {} ({} check(s))", case.id, verification.check_count());

        if let Some(statement) = &verification.comparison {
            tracing::debug!("Comparison statement for {}:\n{}", case.id, statement);
            let outcome = match executor.execute(statement).await {
                Ok(rows) if rows.is_empty() => Outcome::Passed,
                Ok(rows) => Outcome::Mismatch(rows),
                Err(e) => Outcome::UnexpectedError(e),
            };
            record(&mut report, case, "comparison".to_string(), outcome);
        }

        for probe in &verification.error_probes {
            let outcome = match executor.execute(&probe.statement).await {
                Ok(_) => Outcome::UnexpectedSuccess,
                Err(e) if e.code() == Some(probe.expected_code) => Outcome::Passed,
                Err(e) => Outcome::WrongErrorClass {
                    expected: probe.expected_code,
                    actual: e,
                },
            };
            record(&mut report, case, format!("error probe {}", probe.index), outcome);
        }
    }

    tracing::info!("{} passed, {} failed", report.passed(), report.failed());
    report
}

fn record(report: &mut TestReport, case: &TestCase, check: String, outcome: Outcome) {
    if outcome.is_pass() {
        tracing::debug!("{} {}: passed", case.id, check);
    } else {
        tracing::warn!("{} {}: {}", case.id, check, outcome);
    }
    report.results.push(CheckResult {
        case_id: case.id.clone(),
        check,
        outcome,
    });
}
