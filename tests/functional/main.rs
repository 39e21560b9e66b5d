// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Functional tests for full renders.
//!
//! These tests load values files the way the CLI does, render the complete
//! manifest bundle and check the resulting documents. No cluster is needed.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run specific test
//! cargo test --test functional test_managed_mysql_render
//! ```
//!
//! ## Test Categories
//!
//! - **Scenario tests**: one values fixture per deployment mode, rendered end to end
//! - **Layering tests**: several values files plus `--set` overrides
//! - **Output tests**: multi-document stream and per-resource documents

mod fixtures;
mod layering_tests;
mod scenario_tests;
