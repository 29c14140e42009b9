//! Construction-time configuration of a tank network model.

use crate::error::{ModelError, ModelResult};
use crate::params::{PhysicalParams, TimeParams};
use crate::valve::ValveLaw;
use serde::{Deserialize, Serialize};
use tn_core::{GridShape, TankIndex};

/// Acceptance threshold for the residual left by `solve_level`.
///
/// A step is accepted when `||c||_inf <= abs_tol + rel_tol * scale`, where
/// `scale` is the magnitude of the terms balanced in that step (at least 1).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepTolerance {
    pub abs_tol: f64,
    pub rel_tol: f64,
}

impl Default for StepTolerance {
    fn default() -> Self {
        Self {
            abs_tol: 1e-12,
            rel_tol: 1e-13,
        }
    }
}

impl StepTolerance {
    #[inline]
    pub fn threshold(&self, scale: f64) -> f64 {
        self.abs_tol + self.rel_tol * scale.max(1.0)
    }
}

/// Every recognized option of a tank network model.
///
/// Defaults describe a 3x3 network of 10 m tanks filled to 2 m, integrated
/// with Crank-Nicolson over 20 s in 100 steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TankConfig {
    pub rows: usize,
    pub cols: usize,
    pub valve_coefficient: f64,
    pub density: f64,
    pub initial_level: f64,
    pub tank_height: f64,
    pub area: f64,
    pub gravity: f64,
    pub total_time: f64,
    pub theta: f64,
    pub time_steps: usize,
    pub valve_law: ValveLaw,
    /// Full per-tank passthrough vector; all ones when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passthrough: Option<Vec<f64>>,
    /// Tanks whose outflow leaves the network (passthrough forced to 0).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub closed_tanks: Vec<TankIndex>,
    pub tolerance: StepTolerance,
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            rows: 3,
            cols: 3,
            valve_coefficient: 1.0e-2,
            density: 1.0e3,
            initial_level: 2.0,
            tank_height: 10.0,
            area: 10.0,
            gravity: 9.8,
            total_time: 20.0,
            theta: 0.5,
            time_steps: 100,
            valve_law: ValveLaw::default(),
            passthrough: None,
            closed_tanks: Vec::new(),
            tolerance: StepTolerance::default(),
        }
    }
}

fn positive(value: f64, what: &str) -> ModelResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ModelError::config(format!("{what} must be positive, got {value}")))
    }
}

impl TankConfig {
    pub fn with_grid(mut self, rows: usize, cols: usize) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn with_law(mut self, law: ValveLaw) -> Self {
        self.valve_law = law;
        self
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_time(mut self, total_time: f64, time_steps: usize) -> Self {
        self.total_time = total_time;
        self.time_steps = time_steps;
        self
    }

    /// Replace the physical constants.
    pub fn with_physical(mut self, p: PhysicalParams) -> Self {
        self.valve_coefficient = p.valve_coefficient;
        self.density = p.density;
        self.initial_level = p.initial_level;
        self.tank_height = p.tank_height;
        self.area = p.area;
        self.gravity = p.gravity;
        self
    }

    pub fn physical(&self) -> PhysicalParams {
        PhysicalParams {
            valve_coefficient: self.valve_coefficient,
            density: self.density,
            initial_level: self.initial_level,
            tank_height: self.tank_height,
            area: self.area,
            gravity: self.gravity,
        }
    }

    pub fn time(&self) -> TimeParams {
        TimeParams::new(self.total_time, self.theta, self.time_steps)
    }

    pub fn shape(&self) -> ModelResult<GridShape> {
        GridShape::new(self.rows, self.cols)
            .map_err(|_| ModelError::config(format!("invalid grid {}x{}", self.rows, self.cols)))
    }

    /// Check every option; returns the grid shape on success.
    pub fn validate(&self) -> ModelResult<GridShape> {
        let shape = self.shape()?;

        positive(self.valve_coefficient, "valve_coefficient")?;
        positive(self.density, "density")?;
        positive(self.tank_height, "tank_height")?;
        positive(self.area, "area")?;
        positive(self.gravity, "gravity")?;
        positive(self.total_time, "total_time")?;

        if !(self.initial_level.is_finite()
            && self.initial_level >= 0.0
            && self.initial_level <= self.tank_height)
        {
            return Err(ModelError::config(format!(
                "initial_level must lie in [0, {}], got {}",
                self.tank_height, self.initial_level
            )));
        }
        if !(0.0..=1.0).contains(&self.theta) {
            return Err(ModelError::config(format!(
                "theta must lie in [0, 1], got {}",
                self.theta
            )));
        }
        if self.time_steps == 0 {
            return Err(ModelError::config("time_steps must be positive"));
        }

        if let Some(p) = &self.passthrough {
            if p.len() != shape.tanks() {
                return Err(ModelError::config(format!(
                    "passthrough has {} entries for {} tanks",
                    p.len(),
                    shape.tanks()
                )));
            }
            if let Some((k, v)) = p
                .iter()
                .enumerate()
                .find(|(_, v)| !(0.0..=1.0).contains(*v))
            {
                return Err(ModelError::config(format!(
                    "passthrough[{k}] must lie in [0, 1], got {v}"
                )));
            }
        }
        for tank in &self.closed_tanks {
            if !shape.contains(*tank) {
                return Err(ModelError::config(format!(
                    "closed tank ({}, {}) outside {}x{} grid",
                    tank.row, tank.col, self.rows, self.cols
                )));
            }
        }

        positive(self.tolerance.abs_tol, "tolerance.abs_tol")?;
        if !(self.tolerance.rel_tol.is_finite() && self.tolerance.rel_tol >= 0.0) {
            return Err(ModelError::config("tolerance.rel_tol must be non-negative"));
        }

        Ok(shape)
    }

    /// Per-tank passthrough coefficients after closures are applied.
    pub fn passthrough_coefficients(&self, shape: GridShape) -> ModelResult<Vec<f64>> {
        let mut p = self
            .passthrough
            .clone()
            .unwrap_or_else(|| vec![1.0; shape.tanks()]);
        for tank in &self.closed_tanks {
            p[shape.flat(*tank)?] = 0.0;
        }
        Ok(p)
    }
}
