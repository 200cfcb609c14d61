//! Error handling for the planner core
//!
//! Defines custom error types and establishes a unified Result type
//! using anyhow for context chaining and error propagation.
//!
//! Insufficient history is deliberately not an error: period calculators
//! return `Option<f64>` so callers can render "N/A" without touching
//! control flow.

use thiserror::Error;

/// Core error types for planner operations
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("malformed store: {0}")]
    MalformedStore(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Result type alias for planner operations
pub type Result<T> = anyhow::Result<T>;
