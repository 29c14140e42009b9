//! Finite difference directional derivatives.
//!
//! Used to check analytic Jacobian-vector products against the residual
//! they linearize.

use crate::error::{SolverError, SolverResult};
use tn_core::numeric::norm_inf;

fn perturbation(x: &[f64], v: &[f64], epsilon: f64) -> SolverResult<Option<f64>> {
    if x.len() != v.len() {
        return Err(SolverError::DimensionMismatch {
            what: "finite difference direction",
            expected: x.len(),
            actual: v.len(),
        });
    }
    let v_norm = norm_inf(v);
    if v_norm == 0.0 {
        return Ok(None);
    }
    Ok(Some(epsilon * norm_inf(x).max(1.0) / v_norm))
}

fn shifted(x: &[f64], v: &[f64], t: f64) -> Vec<f64> {
    x.iter().zip(v).map(|(xi, vi)| xi + t * vi).collect()
}

/// Central difference `(f(x + t v) - f(x - t v)) / 2t`.
///
/// `f` may fail with any error that a [`SolverError`] converts into.
pub fn central_difference_jvp<F, E>(
    x: &[f64],
    v: &[f64],
    f: F,
    epsilon: f64,
) -> Result<Vec<f64>, E>
where
    F: Fn(&[f64]) -> Result<Vec<f64>, E>,
    E: From<SolverError>,
{
    let Some(t) = perturbation(x, v, epsilon)? else {
        return Ok(vec![0.0; f(x)?.len()]);
    };
    let f_plus = f(&shifted(x, v, t))?;
    let f_minus = f(&shifted(x, v, -t))?;
    Ok(f_plus
        .iter()
        .zip(&f_minus)
        .map(|(a, b)| (a - b) / (2.0 * t))
        .collect())
}
