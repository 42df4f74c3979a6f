//! Global constants used throughout the udfkit codebase.

use std::time::Duration;

/// Project configuration file name, searched for from the current directory upwards.
pub const CONFIG_FILE_NAME: &str = "udfkit.toml";

/// Default directory (relative to the project root) holding definition files.
pub const DEFAULT_DEFINITIONS_DIR: &str = "user_defined_functions";

/// File extensions recognized as definition files.
pub const DEFINITION_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Templated definition fields rendered with the caller's parameters at load time.
pub const TEMPLATED_FIELDS: [&str; 2] = ["project", "dataset"];

/// Parameter name set from `--env`.
pub const ENV_PARAM: &str = "env";

/// Client error code a failing test vector is expected to raise by default.
pub const DEFAULT_EXPECTED_ERROR_CODE: u16 = 400;

/// Default BigQuery REST endpoint.
pub const DEFAULT_BIGQUERY_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Environment variable holding the OAuth access token for the REST executor.
pub const DEFAULT_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Overall deadline for a single statement, including job polling (5 minutes).
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(300);

/// Delay between polls of an unfinished query job.
pub const QUERY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Maximum number of "did you mean" suggestions for unknown names.
pub const MAX_NAME_SUGGESTIONS: usize = 3;
