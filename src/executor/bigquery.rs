//! BigQuery REST executor.
//!
//! Statements are submitted with `jobs.query` and, when the job is still
//! running after the synchronous wait, polled with `jobs.getQueryResults`
//! until complete or until the configured timeout passes. Results spanning
//! several pages are fetched page by page with `pageToken`. Authentication is a
//! bearer token read from an environment variable (for example the output of
//! `gcloud auth print-access-token`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

use super::{Executor, ExecutorError, RowSet};
use crate::constants::{
    DEFAULT_BIGQUERY_ENDPOINT, DEFAULT_QUERY_TIMEOUT, DEFAULT_TOKEN_ENV, QUERY_POLL_INTERVAL,
};
use crate::core::UdfError;

/// Server-side wait per request before a job is reported incomplete.
const SERVER_WAIT_MS: u64 = 10_000;

/// Connection settings for [`BigQueryExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigQuerySettings {
    /// Project the query jobs run in (and are billed to)
    pub project: String,
    /// Job location, e.g. `EU`; `None` lets the service decide
    pub location: Option<String>,
    /// REST endpoint, without trailing slash
    pub endpoint: String,
    /// Environment variable holding the access token
    pub token_env: String,
    /// Deadline for one statement, polling included
    pub timeout: Duration,
}

impl BigQuerySettings {
    /// Default settings for `project`.
    #[must_use]
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: None,
            endpoint: DEFAULT_BIGQUERY_ENDPOINT.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

/// Executes statements through the BigQuery REST API.
#[derive(Debug, Clone)]
pub struct BigQueryExecutor {
    client: reqwest::Client,
    settings: BigQuerySettings,
    token: String,
}

impl BigQueryExecutor {
    /// Create an executor, reading the token from `settings.token_env`.
    ///
    /// # Errors
    ///
    /// Returns [`UdfError::ConfigError`] if the token variable is unset.
    pub fn new(settings: BigQuerySettings) -> Result<Self> {
        let token = std::env::var(&settings.token_env).map_err(|_| UdfError::ConfigError {
            message: format!(
                "environment variable {} must hold a BigQuery access token",
                settings.token_env
            ),
        })?;
        Self::with_token(settings, token)
    }

    /// Create an executor with an explicit access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_token(settings: BigQuerySettings, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            settings,
            token: token.into(),
        })
    }

    async fn run(&self, statement: &str) -> Result<RowSet, ExecutorError> {
        let deadline = Instant::now() + self.settings.timeout;
        let url = format!(
            "{}/projects/{}/queries",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.project
        );
        let request = QueryRequest {
            query: statement,
            use_legacy_sql: false,
            location: self.settings.location.as_deref(),
            timeout_ms: SERVER_WAIT_MS,
        };

        tracing::debug!("Submitting query to {}", url);
        let mut response = self.send(self.client.post(&url).json(&request)).await?;

        while !response.job_complete {
            if Instant::now() >= deadline {
                return Err(self.timed_out());
            }
            let job = response.job_reference.take().ok_or_else(|| ExecutorError::Transport {
                message: "BigQuery returned an incomplete job without a job reference".to_string(),
            })?;

            tracing::debug!("Job {} still running, polling", job.job_id);
            tokio::time::sleep(QUERY_POLL_INTERVAL).await;

            let mut poll = self
                .client
                .get(format!("{url}/{}", job.job_id))
                .query(&[("timeoutMs", SERVER_WAIT_MS.to_string())]);
            if let Some(location) = job.location.as_deref() {
                poll = poll.query(&[("location", location)]);
            }
            response = self.send(poll).await?;
            if response.job_reference.is_none() {
                response.job_reference = Some(job);
            }
        }

        let job = response.job_reference.take();
        let mut rows = RowSet::default();
        let mut page_token = append_page(&mut rows, response);
        while let (Some(token), Some(job)) = (page_token, job.as_ref()) {
            if Instant::now() >= deadline {
                return Err(self.timed_out());
            }
            tracing::debug!("Fetching next result page of job {}", job.job_id);
            let mut request = self
                .client
                .get(format!("{url}/{}", job.job_id))
                .query(&[("pageToken", token.as_str())]);
            if let Some(location) = job.location.as_deref() {
                request = request.query(&[("location", location)]);
            }
            let page = self.send(request).await?;
            page_token = append_page(&mut rows, page);
        }

        Ok(rows)
    }

    fn timed_out(&self) -> ExecutorError {
        ExecutorError::Transport {
            message: format!("Query did not complete within {}s", self.settings.timeout.as_secs()),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<QueryResponse, ExecutorError> {
        let response = request.bearer_auth(&self.token).send().await.map_err(|e| {
            ExecutorError::Transport {
                message: format!("Request to BigQuery failed: {e}"),
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ExecutorError::Transport {
            message: format!("Failed to read BigQuery response: {e}"),
        })?;

        if !status.is_success() {
            return Err(parse_error_body(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(|e| ExecutorError::Transport {
            message: format!("Unreadable BigQuery response: {e}"),
        })
    }
}

impl Executor for BigQueryExecutor {
    fn execute(&self, statement: &str) -> impl Future<Output = Result<RowSet, ExecutorError>> + Send {
        self.run(statement)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    timeout_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    job_reference: Option<JobReference>,
    #[serde(default)]
    schema: Option<Schema>,
    #[serde(default)]
    rows: Vec<Row>,
    #[serde(default)]
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Schema {
    #[serde(default)]
    fields: Vec<Field>,
}

#[derive(Debug, Deserialize)]
struct Field {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    f: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    #[serde(default)]
    v: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl QueryResponse {
    fn into_row_set(self) -> RowSet {
        let columns =
            self.schema.map(|s| s.fields.into_iter().map(|f| f.name).collect()).unwrap_or_default();
        let rows = self
            .rows
            .into_iter()
            .map(|row| row.f.into_iter().map(|cell| cell_text(&cell.v)).collect())
            .collect();
        RowSet::new(columns, rows)
    }
}

/// Add the rows of `page` to `rows`, taking the columns from the first page,
/// and return the token of the next page.
fn append_page(rows: &mut RowSet, mut page: QueryResponse) -> Option<String> {
    let next = page.page_token.take();
    let page = page.into_row_set();
    if rows.columns.is_empty() {
        rows.columns = page.columns;
    }
    rows.rows.extend(page.rows);
    next
}

/// Text of one cell; scalars arrive as JSON strings, NULL as JSON null.
fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_error_body(status: u16, body: &str) -> ExecutorError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(response) => ExecutorError::Client {
            code: response.error.code,
            message: response.error.message,
        },
        Err(_) => ExecutorError::Client {
            code: status,
            message: body.trim().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = BigQuerySettings::new("my-project");
        assert_eq!(settings.endpoint, DEFAULT_BIGQUERY_ENDPOINT);
        assert_eq!(settings.token_env, DEFAULT_TOKEN_ENV);
        assert_eq!(settings.timeout, DEFAULT_QUERY_TIMEOUT);
        assert!(settings.location.is_none());
    }

    #[test]
    fn test_request_payload() {
        let request = QueryRequest {
            query: "select 1",
            use_legacy_sql: false,
            location: Some("EU"),
            timeout_ms: SERVER_WAIT_MS,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["useLegacySql"], false);
        assert_eq!(json["location"], "EU");
        assert_eq!(json["timeoutMs"], 10_000);
    }

    #[test]
    fn test_response_rows() {
        let response: QueryResponse = serde_json::from_str(
            r#"{
                "jobComplete": true,
                "jobReference": {"projectId": "p", "jobId": "job_1", "location": "EU"},
                "schema": {"fields": [{"name": "x", "type": "INTEGER"}, {"name": "result", "type": "INTEGER"}]},
                "rows": [{"f": [{"v": "2"}, {"v": null}]}]
            }"#,
        )
        .unwrap();
        let rows = response.into_row_set();
        assert_eq!(rows.columns, vec!["x", "result"]);
        assert_eq!(rows.rows, vec![vec!["2".to_string(), "NULL".to_string()]]);
    }

    #[test]
    fn test_pages_are_appended_in_order() {
        let first: QueryResponse = serde_json::from_str(
            r#"{
                "jobComplete": true,
                "jobReference": {"jobId": "job_1"},
                "schema": {"fields": [{"name": "x"}]},
                "rows": [{"f": [{"v": "1"}]}],
                "pageToken": "next"
            }"#,
        )
        .unwrap();
        let last: QueryResponse = serde_json::from_str(
            r#"{"jobComplete": true, "schema": {"fields": [{"name": "x"}]}, "rows": [{"f": [{"v": "2"}]}]}"#,
        )
        .unwrap();

        let mut rows = RowSet::default();
        assert_eq!(append_page(&mut rows, first).as_deref(), Some("next"));
        assert_eq!(append_page(&mut rows, last), None);
        assert_eq!(rows.columns, vec!["x"]);
        assert_eq!(rows.rows, vec![vec!["1".to_string()], vec!["2".to_string()]]);
    }

    #[test]
    fn test_incomplete_response_without_rows() {
        let response: QueryResponse =
            serde_json::from_str(r#"{"jobComplete": false, "jobReference": {"jobId": "j"}}"#)
                .unwrap();
        assert!(!response.job_complete);
        assert!(response.into_row_set().is_empty());
    }

    #[test]
    fn test_error_body_is_classified() {
        let error = parse_error_body(
            400,
            r#"{"error": {"code": 400, "message": "Division by zero: 1 / 0", "status": "INVALID_ARGUMENT"}}"#,
        );
        assert_eq!(
            error,
            ExecutorError::Client {
                code: 400,
                message: "Division by zero: 1 / 0".to_string(),
            }
        );
        assert_eq!(parse_error_body(503, "unavailable").code(), Some(503));
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let mut settings = BigQuerySettings::new("p");
        settings.token_env = "UDFKIT_TEST_TOKEN_THAT_IS_NEVER_SET".to_string();
        let err = BigQueryExecutor::new(settings).unwrap_err();
        assert!(matches!(err.downcast_ref::<UdfError>(), Some(UdfError::ConfigError { .. })));
    }
}
