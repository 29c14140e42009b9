//! Trajectory runner for tank network models.
//!
//! Provides:
//! - Control schedules (constant or one control per step)
//! - Fixed-step marching with `solve_level` and decimated recording
//! - Parallel evaluation of several schedules over one shared model
//! - Finite-difference check of the model's Jacobian-vector products

pub mod check;
pub mod error;
pub mod schedule;
pub mod sim;

pub use check::{DerivativeCheck, Directions, check_derivatives};
pub use error::{SimError, SimResult};
pub use schedule::ControlSchedule;
pub use sim::{SimOptions, SimRecord, run_batch, run_sim};
