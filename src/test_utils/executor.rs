//! In-memory executor for tests.

use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::executor::{Executor, ExecutorError, RowSet};

#[derive(Debug, Clone)]
enum Response {
    Rows(RowSet),
    Fail(ExecutorError),
}

/// Records every executed statement and answers from scripted rules.
///
/// Rules match when the statement contains their pattern; the first matching
/// rule wins and unmatched statements succeed with no rows. Clones share the
/// same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    statements: Arc<Mutex<Vec<String>>>,
    rules: Vec<(String, Response)>,
}

impl RecordingExecutor {
    /// Executor that accepts everything and returns no rows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail statements containing `pattern` with `error`.
    #[must_use]
    pub fn fail_when(mut self, pattern: &str, error: ExecutorError) -> Self {
        self.rules.push((pattern.to_string(), Response::Fail(error)));
        self
    }

    /// Answer statements containing `pattern` with `rows`.
    #[must_use]
    pub fn respond_when(mut self, pattern: &str, rows: RowSet) -> Self {
        self.rules.push((pattern.to_string(), Response::Rows(rows)));
        self
    }

    /// Statements executed so far, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn answer(&self, statement: &str) -> Result<RowSet, ExecutorError> {
        if let Ok(mut log) = self.statements.lock() {
            log.push(statement.to_string());
        }
        match self.rules.iter().find(|(pattern, _)| statement.contains(pattern.as_str())) {
            Some((_, Response::Rows(rows))) => Ok(rows.clone()),
            Some((_, Response::Fail(error))) => Err(error.clone()),
            None => Ok(RowSet::default()),
        }
    }
}

impl Executor for RecordingExecutor {
    fn execute(&self, statement: &str) -> impl Future<Output = Result<RowSet, ExecutorError>> + Send {
        let result = self.answer(statement);
        async move { result }
    }
}
