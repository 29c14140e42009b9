//! Error types for solver operations.

use thiserror::Error;
use tn_core::error::TnError;

/// Errors that can occur during banded solves and step acceptance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Entry ({row}, {col}) lies outside the band")]
    OutsideBand { row: usize, col: usize },

    #[error("Singular banded matrix: pivot {pivot} at row {row}")]
    Singular { row: usize, pivot: f64 },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Core error: {0}")]
    Core(#[from] TnError),
}

pub type SolverResult<T> = Result<T, SolverError>;
