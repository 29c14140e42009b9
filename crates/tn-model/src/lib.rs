//! Theta-method model of a rectangular network of fluid tanks.
//!
//! Provides the per-step primitives an optimization loop needs:
//! - `value`: volume-balance residual between two time levels
//! - Jacobian-vector products w.r.t. the old state, new state and control
//!   (plus their adjoints)
//! - `solve_level`: banded implicit solve for the new level
//! - `compute_flow`: valve law and routing from level to flows

pub mod config;
pub mod error;
pub mod operators;
pub mod params;
pub mod routing;
pub mod state;
pub mod valve;

pub use config::{StepTolerance, TankConfig};
pub use error::{ModelError, ModelResult};
pub use params::{Coefficients, PhysicalParams, TimeParams};
pub use routing::Routing;
pub use state::{StepReport, TankState};
pub use valve::{Valve, ValveLaw};
