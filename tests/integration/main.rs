//! Integration tests for Job-Trawl
//!
//! These tests use wiremock to stand in for job boards and the proxy API,
//! and tempfile for output directories.

mod config_tests;
mod pipeline_tests;
mod proxy_tests;
