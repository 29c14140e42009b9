use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Project error: {0}")]
    Project(#[from] tn_project::ProjectError),

    #[error("Model error: {0}")]
    Model(#[from] tn_model::ModelError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] tn_sim::SimError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Derivative check failed: worst relative error {worst:.3e} exceeds {tolerance:.1e}")]
    CheckFailed { worst: f64, tolerance: f64 },
}

pub type CliResult<T> = Result<T, CliError>;
