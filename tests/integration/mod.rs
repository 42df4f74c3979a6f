//! Integration test suite for udfkit
//!
//! End-to-end tests over projects laid out on disk: the library API driven
//! with the in-memory `RecordingExecutor`, and the `udfkit` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: global options, error reporting and exit codes
//! - **deploy**: dependency ordering, cycles, diamonds, partial failures
//! - **harness**: verification statements and the test runner
//! - **render**: `render` output in both modes and across environments
//! - **validate**: `validate` and `tree`

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod deploy;
mod harness;
mod render;
mod validate;
