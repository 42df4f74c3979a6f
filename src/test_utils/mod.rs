//! Test utilities for udfkit
//!
//! Available to the crate's own unit tests and, with the `test-utils`
//! feature, to the integration suite.
//!
//! - [`DefinitionFixture`]: a temporary definition directory with helpers for
//!   writing definition and test vector files
//! - [`RecordingExecutor`]: an in-memory [`Executor`](crate::executor::Executor)
//!   that records statements and answers with scripted results
//! - [`init_test_logging`]: once-guarded tracing setup
//!
//! # Example
//!
//! ```rust,no_run
//! use udfkit::test_utils::DefinitionFixture;
//!
//! let fixture = DefinitionFixture::new();
//! fixture.add_sql("inc", "x + 1");
//! let store = fixture.store();
//! assert!(store.contains("inc"));
//! ```

mod executor;
mod fixtures;

pub use executor::RecordingExecutor;
pub use fixtures::DefinitionFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG` when set; with neither,
/// logging stays off.
///
/// ```bash
/// RUST_LOG=udfkit=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
