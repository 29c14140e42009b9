//! Physical and time-discretization parameters and the coefficients
//! derived from them.

use tn_core::units::{Accel, Area, Density, Length};
use uom::si::{
    acceleration::meter_per_second_squared, area::square_meter,
    length::meter, mass_density::kilogram_per_cubic_meter,
};

/// Physical constants of the tank network, in SI units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicalParams {
    /// Valve constant Cv
    pub valve_coefficient: f64,
    /// Fluid density (kg/m³)
    pub density: f64,
    /// Initial fluid level (m)
    pub initial_level: f64,
    /// Tank height (m)
    pub tank_height: f64,
    /// Cross-sectional area (m²)
    pub area: f64,
    /// Gravitational acceleration (m/s²)
    pub gravity: f64,
}

impl PhysicalParams {
    /// Build from dimensioned quantities. Cv is dimensionless in this model.
    pub fn from_quantities(
        valve_coefficient: f64,
        density: Density,
        initial_level: Length,
        tank_height: Length,
        area: Area,
        gravity: Accel,
    ) -> Self {
        Self {
            valve_coefficient,
            density: density.get::<kilogram_per_cubic_meter>(),
            initial_level: initial_level.get::<meter>(),
            tank_height: tank_height.get::<meter>(),
            area: area.get::<square_meter>(),
            gravity: gravity.get::<meter_per_second_squared>(),
        }
    }
}

/// Theta-method time discretization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeParams {
    /// Total time horizon T (s)
    pub total_time: f64,
    /// Implicit/explicit splitting factor in [0, 1]
    pub theta: f64,
    /// Number of time steps Nt
    pub time_steps: usize,
    /// Step size T / Nt
    pub dt: f64,
}

impl TimeParams {
    pub fn new(total_time: f64, theta: f64, time_steps: usize) -> Self {
        Self {
            total_time,
            theta,
            time_steps,
            dt: total_time / time_steps as f64,
        }
    }
}

/// Composite coefficients fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coefficients {
    /// Cv * rho * g
    pub coeff1: f64,
    /// Cv * rho * g * dt / (2A)
    pub kappa: f64,
    /// (theta - 1) * dt / A
    pub beta_l: f64,
    /// theta * dt / A
    pub beta_r: f64,
    /// dt / A
    pub dt_over_area: f64,
}

impl Coefficients {
    pub fn derive(phys: &PhysicalParams, time: &TimeParams) -> Self {
        let coeff1 = phys.valve_coefficient * phys.density * phys.gravity;
        let dt_over_area = time.dt / phys.area;
        Self {
            coeff1,
            kappa: coeff1 * time.dt / (2.0 * phys.area),
            beta_l: (time.theta - 1.0) * dt_over_area,
            beta_r: time.theta * dt_over_area,
            dt_over_area,
        }
    }
}
