//! Shared utilities
//!
//! This module provides error handling used throughout the engine.

pub mod error;

pub use error::{AuthzError, Result};
