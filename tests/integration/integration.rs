//! Integration test runner.
//!
//! Run everything that needs no external services:
//!   cargo test -p hookcut-integration-tests
//!
//! Run the tests that need Redis (`REDIS_URL`):
//!   cargo test -p hookcut-integration-tests -- --ignored

mod api_tests;
mod redis_tests;
mod workflow_tests;
