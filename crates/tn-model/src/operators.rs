//! Level operators of the theta-method.
//!
//! Linearizing the flow balance around levels `h` gives
//! `G(h) = (I - S) D(h)` with `D = diag(dQout/dh)` and `S` the routing
//! operator. The implicit operator is `I + betaR G` and the explicit one
//! `I + betaL G`; both are lower banded with bandwidth `cols`.

use crate::routing::Routing;
use tn_core::GridShape;
use tn_solver::{BandedMatrix, SolverResult};

/// Lower bandwidth needed for a grid: the tank above sits `cols` entries back.
pub fn bandwidth(shape: GridShape) -> usize {
    if shape.rows() > 1 {
        shape.cols()
    } else if shape.cols() > 1 {
        1
    } else {
        0
    }
}

/// `I + beta (I - S) D` for fixed slopes, applied matrix-free or assembled.
pub struct FlowOperator<'a> {
    routing: &'a Routing,
    slopes: Vec<f64>,
    beta: f64,
}

impl<'a> FlowOperator<'a> {
    pub fn new(routing: &'a Routing, slopes: Vec<f64>, beta: f64) -> Self {
        Self {
            routing,
            slopes,
            beta,
        }
    }

    pub fn apply(&self, v: &[f64]) -> Vec<f64> {
        let w: Vec<f64> = v.iter().zip(&self.slopes).map(|(vi, si)| vi * si).collect();
        let mut sw = vec![0.0; w.len()];
        self.routing.apply(&w, &mut sw);
        v.iter()
            .zip(w.iter().zip(&sw))
            .map(|(vi, (wi, swi))| vi + self.beta * (wi - swi))
            .collect()
    }

    pub fn apply_transpose(&self, v: &[f64]) -> Vec<f64> {
        let mut stv = vec![0.0; v.len()];
        self.routing.apply_transpose(v, &mut stv);
        v.iter()
            .zip(stv.iter().zip(&self.slopes))
            .map(|(vi, (sti, si))| vi + self.beta * si * (vi - sti))
            .collect()
    }

    pub fn assemble(&self) -> SolverResult<BandedMatrix> {
        let shape = self.routing.shape();
        let n = shape.tanks();
        let mut m = BandedMatrix::new(n, bandwidth(shape), 0);
        for k in 0..n {
            m.set(k, k, 1.0 + self.beta * self.slopes[k])?;
            if let Some(up) = shape.up(k) {
                m.set(k, up, -self.beta * self.routing.weight(up) * self.slopes[up])?;
            }
            if let Some(left) = shape.left(k) {
                m.set(k, left, -self.beta * self.routing.weight(left) * self.slopes[left])?;
            }
        }
        Ok(m)
    }
}
