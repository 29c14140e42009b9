//! Error types for simulation operations.

use thiserror::Error;
use tn_model::ModelError;

/// Errors encountered while marching a trajectory.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Step {step} failed: {source}")]
    Step {
        step: usize,
        #[source]
        source: ModelError,
    },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<tn_solver::SolverError> for SimError {
    fn from(e: tn_solver::SolverError) -> Self {
        SimError::Model(ModelError::from(e))
    }
}

impl From<tn_core::TnError> for SimError {
    fn from(e: tn_core::TnError) -> Self {
        SimError::Model(ModelError::from(e))
    }
}
