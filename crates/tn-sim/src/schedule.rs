//! Control inflow schedules.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

/// Inflow applied to every tank over a trajectory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum ControlSchedule {
    /// Same control at every step.
    Constant(Vec<f64>),
    /// One control per step; the last one is held if the run is longer.
    PerStep(Vec<Vec<f64>>),
}

impl ControlSchedule {
    pub fn zero(tanks: usize) -> Self {
        ControlSchedule::Constant(vec![0.0; tanks])
    }

    /// Control used for step `step` (0-based).
    pub fn control(&self, step: usize) -> &[f64] {
        match self {
            ControlSchedule::Constant(z) => z,
            ControlSchedule::PerStep(zs) => {
                let i = step.min(zs.len().saturating_sub(1));
                &zs[i]
            }
        }
    }

    pub fn validate(&self, tanks: usize) -> SimResult<()> {
        let check = |z: &[f64], at: String| -> SimResult<()> {
            if z.len() != tanks {
                return Err(SimError::InvalidArg {
                    what: format!("control {at} has {} entries for {tanks} tanks", z.len()),
                });
            }
            if let Some(v) = z.iter().find(|v| !v.is_finite()) {
                return Err(SimError::InvalidArg {
                    what: format!("control {at} contains non-finite value {v}"),
                });
            }
            Ok(())
        };
        match self {
            ControlSchedule::Constant(z) => check(z, "(constant)".to_string()),
            ControlSchedule::PerStep(zs) => {
                if zs.is_empty() {
                    return Err(SimError::InvalidArg {
                        what: "per-step schedule is empty".to_string(),
                    });
                }
                for (i, z) in zs.iter().enumerate() {
                    check(z, format!("for step {i}"))?;
                }
                Ok(())
            }
        }
    }
}
