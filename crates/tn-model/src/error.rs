//! Error types for tank model operations.

use thiserror::Error;
use tn_core::error::TnError;
use tn_solver::SolverError;

/// Errors raised by model construction and per-step evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid configuration: {what}")]
    Config { what: String },

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Core error: {0}")]
    Core(TnError),
}

pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    pub(crate) fn config(what: impl Into<String>) -> Self {
        ModelError::Config { what: what.into() }
    }
}

impl From<TnError> for ModelError {
    fn from(e: TnError) -> Self {
        match e {
            TnError::LengthMismatch {
                what,
                expected,
                actual,
            } => ModelError::LengthMismatch {
                what,
                expected,
                actual,
            },
            other => ModelError::Core(other),
        }
    }
}
