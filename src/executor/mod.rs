//! The statement executor boundary.
//!
//! The resolver and the test harness only produce statement text. Running a
//! statement is delegated to an [`Executor`], which returns the result rows or
//! a classified [`ExecutorError`]. [`BigQueryExecutor`] talks to the BigQuery
//! REST API; tests use the in-memory recorder from `test_utils`.

mod bigquery;

pub use bigquery::{BigQueryExecutor, BigQuerySettings};

use serde::Serialize;
use std::future::Future;
use thiserror::Error;

/// Runs one statement (possibly a multi-statement script) to completion.
pub trait Executor {
    /// Execute `statement` and return the rows of its final result.
    ///
    /// Statements are awaited one at a time; implementations need not
    /// support concurrent calls.
    fn execute(&self, statement: &str) -> impl Future<Output = Result<RowSet, ExecutorError>> + Send;
}

/// Why a statement failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// The service rejected the statement and reported an error code
    /// (e.g. 400 for invalid queries or errors raised by a function).
    #[error("{message} (code {code})")]
    Client {
        /// Error code reported by the service
        code: u16,
        /// Service message
        message: String,
    },

    /// The statement never reached a verdict: network failure, timeout or an
    /// unreadable response.
    #[error("{message}")]
    Transport {
        /// What went wrong
        message: String,
    },
}

impl ExecutorError {
    /// The classified error code, if the service reported one.
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        match self {
            ExecutorError::Client {
                code,
                ..
            } => Some(*code),
            ExecutorError::Transport {
                ..
            } => None,
        }
    }

    /// Error message without the code suffix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            ExecutorError::Client {
                message,
                ..
            }
            | ExecutorError::Transport {
                message,
            } => message,
        }
    }
}

/// Rows returned by a statement, every cell rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowSet {
    /// Column names, in schema order
    pub columns: Vec<String>,
    /// Row values, one `Vec` per row in column order
    pub rows: Vec<Vec<String>>,
}

impl RowSet {
    /// Build a row set from column names and rows.
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            columns,
            rows,
        }
    }

    /// Whether the statement returned no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Render as an aligned text table with a dashed separator under the header.
    ///
    /// ```text
    /// x | y | total | result
    /// - | - | ----- | ------
    /// 2 | 3 | 6     | 5
    /// ```
    #[must_use]
    pub fn format_table(&self) -> String {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(width) => *width = (*width).max(len),
                    None => widths.push(len),
                }
            }
        }

        let format_row = |cells: &[String]| -> String {
            widths
                .iter()
                .enumerate()
                .map(|(i, &width)| {
                    let cell = cells.get(i).map_or("", String::as_str);
                    format!("{cell:<width$}")
                })
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(format_row(self.columns.as_slice()));
        lines.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join(" | "));
        lines.extend(self.rows.iter().map(|row| format_row(row.as_slice())));
        lines.join("\n")
    }
}
