#![allow(unused_imports)]
//! Shared test utilities for integration tests.
//!
//! # Modules
//!
//! - `fixtures`: Loader and transport setup, descriptor directories
//! - `assertions`: Assertion helpers with better failure messages

pub mod assertions;
pub mod fixtures;

pub use fixtures::{
    constant_bundle, descriptor_dir, memory_loader, memory_loader_with, write_descriptor, BASE_URL,
};

// Re-export assertion helpers for better test error messages
pub use assertions::{assert_err, assert_error_contains, assert_exports_eq, assert_ok};
