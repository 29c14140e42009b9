//! Finite-difference check of the step Jacobians.

use crate::error::{SimError, SimResult};
use tn_core::{dot, norm_inf};
use tn_model::{ModelResult, TankState};
use tn_solver::central_difference_jvp;

/// Perturbation directions for [`check_derivatives`].
#[derive(Clone, Debug, PartialEq)]
pub struct Directions {
    /// State-length direction; only its level block influences the residual
    pub state: Vec<f64>,
    /// Control-length direction
    pub control: Vec<f64>,
    /// Residual-length weights for the adjoint identities
    pub weights: Vec<f64>,
}

impl Directions {
    /// Deterministic, non-degenerate directions sized for `model`.
    pub fn sample(model: &TankState) -> Self {
        let n = model.tanks();
        let wave = |k: usize, phase: f64| ((k as f64 + 1.0) * 0.7 + phase).sin();
        Self {
            state: (0..model.layout().state_len()).map(|k| wave(k, 0.0)).collect(),
            control: (0..n).map(|k| wave(k, 1.3)).collect(),
            weights: (0..n).map(|k| wave(k, 2.1)).collect(),
        }
    }
}

/// Relative errors of each analytic product.
#[derive(Clone, Debug, PartialEq)]
pub struct DerivativeCheck {
    /// Perturbation scale handed to the finite differences
    pub step: f64,
    pub jacobian_old: f64,
    pub jacobian_new: f64,
    pub jacobian_control: f64,
    pub adjoint_old: f64,
    pub adjoint_new: f64,
    pub adjoint_control: f64,
}

impl DerivativeCheck {
    pub fn worst(&self) -> f64 {
        [
            self.jacobian_old,
            self.jacobian_new,
            self.jacobian_control,
            self.adjoint_old,
            self.adjoint_new,
            self.adjoint_control,
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }
}

fn relative(analytic: &[f64], reference: &[f64]) -> f64 {
    let diff: Vec<f64> = analytic.iter().zip(reference).map(|(a, r)| a - r).collect();
    norm_inf(&diff) / norm_inf(reference).max(1.0)
}

fn relative_scalar(a: f64, b: f64) -> f64 {
    (a - b).abs() / a.abs().max(b.abs()).max(1.0)
}

/// Compare the three Jacobian-vector products at `(u_old, u_new, z)` with
/// central differences of [`TankState::value`], and check
/// `<w, J v> = <J^T w, v>` for each adjoint.
pub fn check_derivatives(
    model: &TankState,
    u_old: &[f64],
    u_new: &[f64],
    z: &[f64],
    directions: &Directions,
    step: f64,
) -> SimResult<DerivativeCheck> {
    if !(step.is_finite() && step > 0.0) {
        return Err(SimError::InvalidArg {
            what: format!("finite difference step must be positive, got {step}"),
        });
    }
    let n = model.tanks();
    let v = &directions.state;
    let vz = &directions.control;
    let w = &directions.weights;

    let residual = |a: &[f64], b: &[f64], c: &[f64]| -> ModelResult<Vec<f64>> {
        let mut out = vec![0.0; n];
        model.value(&mut out, a, b, c)?;
        Ok(out)
    };

    let mut jv = vec![0.0; n];
    let mut ajv = model.zero_state();
    let mut ajz = model.zero_control();

    model.apply_jacobian_1_old(&mut jv, u_old, v)?;
    let fd = central_difference_jvp(u_old, v, |u| residual(u, u_new, z), step)?;
    let jacobian_old = relative(&jv, &fd);
    model.apply_adjoint_jacobian_1_old(&mut ajv, u_old, w)?;
    let adjoint_old = relative_scalar(dot(w, &jv), dot(&ajv, v));

    model.apply_jacobian_1_new(&mut jv, u_new, v)?;
    let fd = central_difference_jvp(u_new, v, |u| residual(u_old, u, z), step)?;
    let jacobian_new = relative(&jv, &fd);
    model.apply_adjoint_jacobian_1_new(&mut ajv, u_new, w)?;
    let adjoint_new = relative_scalar(dot(w, &jv), dot(&ajv, v));

    model.apply_jacobian_2(&mut jv, vz)?;
    let fd = central_difference_jvp(z, vz, |zz| residual(u_old, u_new, zz), step)?;
    let jacobian_control = relative(&jv, &fd);
    model.apply_adjoint_jacobian_2(&mut ajz, w)?;
    let adjoint_control = relative_scalar(dot(w, &jv), dot(&ajz, vz));

    let report = DerivativeCheck {
        step,
        jacobian_old,
        jacobian_new,
        jacobian_control,
        adjoint_old,
        adjoint_new,
        adjoint_control,
    };
    tracing::debug!(worst = report.worst(), step, "derivative check");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tn_model::TankConfig;

    fn point(model: &TankState) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let z: Vec<f64> = (0..model.tanks()).map(|k| 0.1 * k as f64).collect();
        let u_old = model.initial_state();
        let mut u_new = model.zero_state();
        let mut c = model.zero_control();
        model.solve_level(&mut c, &mut u_new, &u_old, &z).unwrap();
        (u_old, u_new, z)
    }

    #[test]
    fn analytic_products_pass() {
        let model = TankState::new(&TankConfig::default()).unwrap();
        let (u_old, u_new, z) = point(&model);
        let dirs = Directions::sample(&model);
        let report = check_derivatives(&model, &u_old, &u_new, &z, &dirs, 1e-6).unwrap();
        assert!(report.worst() < 1e-6, "{report:?}");
    }

    #[test]
    fn bad_step_is_rejected() {
        let model = TankState::new(&TankConfig::default().with_grid(1, 1)).unwrap();
        let (u_old, u_new, z) = point(&model);
        let dirs = Directions::sample(&model);
        assert!(check_derivatives(&model, &u_old, &u_new, &z, &dirs, 0.0).is_err());
        assert!(check_derivatives(&model, &u_old, &u_new, &z, &dirs, f64::NAN).is_err());
    }

    #[test]
    fn short_direction_is_reported() {
        let model = TankState::new(&TankConfig::default().with_grid(2, 2)).unwrap();
        let (u_old, u_new, z) = point(&model);
        let mut dirs = Directions::sample(&model);
        dirs.control.pop();
        let err = check_derivatives(&model, &u_old, &u_new, &z, &dirs, 1e-6).unwrap_err();
        assert!(matches!(err, SimError::Model(_)));
    }
}
