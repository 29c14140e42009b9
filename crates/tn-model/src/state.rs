//! Tank network state model: residual, Jacobian-vector products and the
//! per-step implicit solve of the theta-method.
//!
//! A state is a flat `[h | Qout | Qin]` vector owned by the caller. The level
//! block is the primary unknown; outflow and inflow are dependent quantities
//! that [`TankState::compute_flow`] fills in from the level and the control.
//! Residual and Jacobian routines therefore read only the level block.
//!
//! Per tank, one step of the scheme is the volume balance
//!
//! ```text
//! c = h_new - h_old - dt/A * ( theta*(Qin_new - Qout_new) + (1-theta)*(Qin_old - Qout_old) )
//! ```
//!
//! with `Qout = q(h)` from the valve law and
//! `Qin = z + ½p(up) Qout(up) + ½p(left) Qout(left)`.

use crate::config::{StepTolerance, TankConfig};
use crate::error::ModelResult;
use crate::operators::FlowOperator;
use crate::params::{Coefficients, PhysicalParams, TimeParams};
use crate::routing::Routing;
use crate::valve::{Valve, ValveLaw};
use std::fmt;
use tn_core::numeric::{ensure_len, norm_inf};
use tn_core::{Block, GridShape, StateLayout};
use tn_solver::{BandedLu, BandedMatrix, SolverError, factorize};

/// Outcome of one [`TankState::solve_level`] call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    /// The banded predictor missed the tolerance and the step was finished
    /// by substitution through the valve law.
    pub corrected: bool,
    /// Max-norm of the residual at the returned state.
    pub residual_norm: f64,
}

/// Theta-method model of a rectangular tank network.
///
/// Immutable after construction; every operation takes `&self` and works on
/// caller-owned vectors, so one instance can serve many threads.
#[derive(Clone, Debug)]
pub struct TankState {
    layout: StateLayout,
    physical: PhysicalParams,
    time: TimeParams,
    coeffs: Coefficients,
    valve: Valve,
    routing: Routing,
    tolerance: StepTolerance,
    implicit: BandedMatrix,
    implicit_lu: BandedLu,
    explicit: BandedMatrix,
}

impl TankState {
    pub fn new(config: &TankConfig) -> ModelResult<Self> {
        let shape = config.validate()?;
        let physical = config.physical();
        let time = config.time();
        let coeffs = Coefficients::derive(&physical, &time);
        let valve = Valve::new(
            config.valve_law,
            physical.valve_coefficient,
            physical.density,
            physical.gravity,
        );
        let routing = Routing::new(shape, config.passthrough_coefficients(shape)?);

        // Operators linearized at the nominal initial level.
        let nominal = vec![valve.nominal_slope(physical.initial_level); shape.tanks()];
        let implicit = FlowOperator::new(&routing, nominal.clone(), coeffs.beta_r).assemble()?;
        let explicit = FlowOperator::new(&routing, nominal, coeffs.beta_l).assemble()?;
        let implicit_lu = factorize(&implicit)?;

        let model = Self {
            layout: StateLayout::new(shape),
            physical,
            time,
            coeffs,
            valve,
            routing,
            tolerance: config.tolerance,
            implicit,
            implicit_lu,
            explicit,
        };
        tracing::debug!("constructed tank network model\n{model}");
        Ok(model)
    }

    pub fn shape(&self) -> GridShape {
        self.layout.shape()
    }

    pub fn layout(&self) -> StateLayout {
        self.layout
    }

    pub fn tanks(&self) -> usize {
        self.shape().tanks()
    }

    pub fn physical(&self) -> &PhysicalParams {
        &self.physical
    }

    pub fn time(&self) -> &TimeParams {
        &self.time
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coeffs
    }

    pub fn valve_law(&self) -> ValveLaw {
        self.valve.law
    }

    pub fn passthrough(&self) -> &[f64] {
        self.routing.passthrough()
    }

    /// Implicit (new time level) operator `L`.
    pub fn implicit_operator(&self) -> &BandedMatrix {
        &self.implicit
    }

    /// Explicit (old time level) operator `R`.
    pub fn explicit_operator(&self) -> &BandedMatrix {
        &self.explicit
    }

    // ---------- accessors -------------------------------------------------

    pub fn h(&self, x: &[f64], row: usize, col: usize) -> ModelResult<f64> {
        Ok(self.layout.get(x, Block::Level, row, col)?)
    }

    pub fn h_mut<'a>(&self, x: &'a mut [f64], row: usize, col: usize) -> ModelResult<&'a mut f64> {
        Ok(self.layout.get_mut(x, Block::Level, row, col)?)
    }

    pub fn qout(&self, x: &[f64], row: usize, col: usize) -> ModelResult<f64> {
        Ok(self.layout.get(x, Block::Outflow, row, col)?)
    }

    pub fn qout_mut<'a>(
        &self,
        x: &'a mut [f64],
        row: usize,
        col: usize,
    ) -> ModelResult<&'a mut f64> {
        Ok(self.layout.get_mut(x, Block::Outflow, row, col)?)
    }

    pub fn qin(&self, x: &[f64], row: usize, col: usize) -> ModelResult<f64> {
        Ok(self.layout.get(x, Block::Inflow, row, col)?)
    }

    pub fn qin_mut<'a>(
        &self,
        x: &'a mut [f64],
        row: usize,
        col: usize,
    ) -> ModelResult<&'a mut f64> {
        Ok(self.layout.get_mut(x, Block::Inflow, row, col)?)
    }

    pub fn zero_state(&self) -> Vec<f64> {
        vec![0.0; self.layout.state_len()]
    }

    pub fn zero_control(&self) -> Vec<f64> {
        vec![0.0; self.layout.control_len()]
    }

    /// Every tank at the initial level, flows consistent with zero control.
    pub fn initial_state(&self) -> Vec<f64> {
        let n = self.tanks();
        let mut u = self.zero_state();
        u[..n].fill(self.physical.initial_level);
        self.fill_flow(&mut u, &self.zero_control());
        u
    }

    /// Stored volume `A * sum(h)`.
    pub fn total_volume(&self, u: &[f64]) -> ModelResult<f64> {
        let h = self.layout.block(u, Block::Level)?;
        Ok(self.physical.area * h.iter().sum::<f64>())
    }

    fn check_state(&self, u: &[f64], what: &'static str) -> ModelResult<()> {
        Ok(ensure_len(u, self.layout.state_len(), what)?)
    }

    fn check_tanks(&self, v: &[f64], what: &'static str) -> ModelResult<()> {
        Ok(ensure_len(v, self.tanks(), what)?)
    }

    // ---------- flow ------------------------------------------------------

    /// Given `u = (h, Qout, Qin)` and control `z`, update `Qout` and `Qin` from `h`.
    pub fn compute_flow(&self, u: &mut [f64], z: &[f64]) -> ModelResult<()> {
        self.check_state(u, "state")?;
        self.check_tanks(z, "control")?;
        self.fill_flow(u, z);
        Ok(())
    }

    // Lengths already checked.
    fn fill_flow(&self, u: &mut [f64], z: &[f64]) {
        let n = self.tanks();
        let (h, flows) = u.split_at_mut(n);
        let (qout, qin) = flows.split_at_mut(n);
        for (q, &hk) in qout.iter_mut().zip(h.iter()) {
            *q = self.valve.outflow(hk);
        }
        self.routing.apply(qout, qin);
        for (qi, zk) in qin.iter_mut().zip(z) {
            *qi += zk;
        }
    }

    /// `Qin - Qout` for levels `h` and control `z`.
    fn net_inflow(&self, h: &[f64], z: &[f64]) -> Vec<f64> {
        let qout: Vec<f64> = h.iter().map(|&hk| self.valve.outflow(hk)).collect();
        let mut net = vec![0.0; h.len()];
        self.routing.apply(&qout, &mut net);
        for ((nk, zk), qk) in net.iter_mut().zip(z).zip(&qout) {
            *nk += zk - qk;
        }
        net
    }

    fn residual_with(&self, h_new: &[f64], h_old: &[f64], old_part: &[f64], z: &[f64]) -> Vec<f64> {
        let theta = self.time.theta;
        let net_new = self.net_inflow(h_new, z);
        h_new
            .iter()
            .zip(h_old)
            .zip(net_new.iter().zip(old_part))
            .map(|((hn, ho), (fn_, fo))| {
                hn - ho - self.coeffs.dt_over_area * (theta * fn_ + (1.0 - theta) * fo)
            })
            .collect()
    }

    // ---------- residual --------------------------------------------------

    /// Volume balance residual of one step; `c` has one entry per tank.
    pub fn value(&self, c: &mut [f64], u_old: &[f64], u_new: &[f64], z: &[f64]) -> ModelResult<()> {
        self.check_tanks(c, "residual")?;
        self.check_state(u_old, "old state")?;
        self.check_state(u_new, "new state")?;
        self.check_tanks(z, "control")?;

        let h_old = self.layout.block(u_old, Block::Level)?;
        let h_new = self.layout.block(u_new, Block::Level)?;
        let old_part = self.net_inflow(h_old, z);
        c.copy_from_slice(&self.residual_with(h_new, h_old, &old_part, z));
        Ok(())
    }

    // ---------- Jacobian-vector products ----------------------------------

    fn slopes(&self, h: &[f64]) -> Vec<f64> {
        h.iter().map(|&hk| self.valve.slope(hk)).collect()
    }

    /// `jv = dc/du_old · v_old = -(I + betaL G(h_old)) v_h`.
    pub fn apply_jacobian_1_old(
        &self,
        jv: &mut [f64],
        u_old: &[f64],
        v_old: &[f64],
    ) -> ModelResult<()> {
        self.check_tanks(jv, "jacobian output")?;
        self.check_state(v_old, "old direction")?;
        let h_old = self.layout.block(u_old, Block::Level)?;
        let v = self.layout.block(v_old, Block::Level)?;
        let op = FlowOperator::new(&self.routing, self.slopes(h_old), self.coeffs.beta_l);
        for (out, r) in jv.iter_mut().zip(op.apply(v)) {
            *out = -r;
        }
        Ok(())
    }

    /// `jv = dc/du_new · v_new = (I + betaR G(h_new)) v_h`.
    pub fn apply_jacobian_1_new(
        &self,
        jv: &mut [f64],
        u_new: &[f64],
        v_new: &[f64],
    ) -> ModelResult<()> {
        self.check_tanks(jv, "jacobian output")?;
        self.check_state(v_new, "new direction")?;
        let h_new = self.layout.block(u_new, Block::Level)?;
        let v = self.layout.block(v_new, Block::Level)?;
        let op = FlowOperator::new(&self.routing, self.slopes(h_new), self.coeffs.beta_r);
        jv.copy_from_slice(&op.apply(v));
        Ok(())
    }

    /// `jv = dc/dz · v_z = -(dt/A) v_z`.
    pub fn apply_jacobian_2(&self, jv: &mut [f64], v_z: &[f64]) -> ModelResult<()> {
        self.check_tanks(jv, "jacobian output")?;
        self.check_tanks(v_z, "control direction")?;
        for (out, v) in jv.iter_mut().zip(v_z) {
            *out = -self.coeffs.dt_over_area * v;
        }
        Ok(())
    }

    /// Transpose of [`apply_jacobian_1_old`](Self::apply_jacobian_1_old);
    /// `ajv` is a state vector with zero flow blocks.
    pub fn apply_adjoint_jacobian_1_old(
        &self,
        ajv: &mut [f64],
        u_old: &[f64],
        w: &[f64],
    ) -> ModelResult<()> {
        self.check_state(ajv, "adjoint output")?;
        self.check_tanks(w, "adjoint direction")?;
        let h_old = self.layout.block(u_old, Block::Level)?;
        let op = FlowOperator::new(&self.routing, self.slopes(h_old), self.coeffs.beta_l);
        let t = op.apply_transpose(w);
        let (h, qout, qin) = self.layout.split_mut(ajv)?;
        for (out, r) in h.iter_mut().zip(t) {
            *out = -r;
        }
        qout.fill(0.0);
        qin.fill(0.0);
        Ok(())
    }

    /// Transpose of [`apply_jacobian_1_new`](Self::apply_jacobian_1_new).
    pub fn apply_adjoint_jacobian_1_new(
        &self,
        ajv: &mut [f64],
        u_new: &[f64],
        w: &[f64],
    ) -> ModelResult<()> {
        self.check_state(ajv, "adjoint output")?;
        self.check_tanks(w, "adjoint direction")?;
        let h_new = self.layout.block(u_new, Block::Level)?;
        let op = FlowOperator::new(&self.routing, self.slopes(h_new), self.coeffs.beta_r);
        let t = op.apply_transpose(w);
        let (h, qout, qin) = self.layout.split_mut(ajv)?;
        h.copy_from_slice(&t);
        qout.fill(0.0);
        qin.fill(0.0);
        Ok(())
    }

    /// Transpose of [`apply_jacobian_2`](Self::apply_jacobian_2).
    pub fn apply_adjoint_jacobian_2(&self, ajv: &mut [f64], w: &[f64]) -> ModelResult<()> {
        self.apply_jacobian_2(ajv, w)
    }

    // ---------- step solve ------------------------------------------------

    /// Advance one step: compute `u_new` from `u_old` and `z`, and leave the
    /// residual at the solution in `c`.
    ///
    /// The construction-time operators give a predictor `L h = R h_old + dt/A z`
    /// from one banded solve. When the operators are exact for the valve law
    /// the predictor already satisfies the balance. Otherwise the step is
    /// finished by forward substitution in row-major order: inflow to tank `k`
    /// only comes from tanks before it, so each tank is a scalar balance
    /// `h + betaR q(h) = b` solved in closed form by [`Valve::solve_balance`].
    ///
    /// A step whose residual is not within the configured tolerance is an
    /// error; `u_new` and `c` are left untouched in that case.
    pub fn solve_level(
        &self,
        c: &mut [f64],
        u_new: &mut [f64],
        u_old: &[f64],
        z: &[f64],
    ) -> ModelResult<StepReport> {
        self.check_tanks(c, "residual")?;
        self.check_state(u_new, "new state")?;
        self.check_state(u_old, "old state")?;
        self.check_tanks(z, "control")?;

        let h_old = self.layout.block(u_old, Block::Level)?;
        let old_part = self.net_inflow(h_old, z);
        let dta = self.coeffs.dt_over_area;
        let forcing = dta * (norm_inf(&old_part) + norm_inf(z));
        let threshold = |h_new: &[f64]| {
            let scale = norm_inf(h_old).max(norm_inf(h_new)).max(forcing);
            self.tolerance.threshold(scale)
        };

        let mut rhs = self.explicit.apply(h_old)?;
        for (r, zk) in rhs.iter_mut().zip(z) {
            *r += dta * zk;
        }
        let h_pred = self.implicit_lu.solve(&rhs)?;
        let r_pred = self.residual_with(&h_pred, h_old, &old_part, z);
        let pred_norm = norm_inf(&r_pred);

        let (h, residual, corrected) = if pred_norm <= threshold(&h_pred) {
            (h_pred, r_pred, false)
        } else {
            let h = self.substitute(h_old, &old_part, z);
            let r = self.residual_with(&h, h_old, &old_part, z);
            tracing::trace!(
                predictor_residual = pred_norm,
                "banded predictor rejected, substituting through the valve law"
            );
            (h, r, true)
        };

        let residual_norm = norm_inf(&residual);
        let tol = threshold(&h);
        if !(residual_norm <= tol) {
            return Err(SolverError::ConvergenceFailed {
                what: format!("step residual {residual_norm:e} exceeds {tol:e}"),
            }
            .into());
        }

        self.layout.block_mut(u_new, Block::Level)?.copy_from_slice(&h);
        self.fill_flow(u_new, z);
        c.copy_from_slice(&residual);

        Ok(StepReport {
            corrected,
            residual_norm,
        })
    }

    /// Levels satisfying the step balance exactly, one tank at a time.
    fn substitute(&self, h_old: &[f64], old_part: &[f64], z: &[f64]) -> Vec<f64> {
        let n = self.tanks();
        let theta = self.time.theta;
        let dta = self.coeffs.dt_over_area;
        let mut h = vec![0.0; n];
        let mut qout = vec![0.0; n];
        for k in 0..n {
            let inflow = z[k] + self.routing.inflow_at(k, &qout);
            let b = h_old[k] + dta * (theta * inflow + (1.0 - theta) * old_part[k]);
            h[k] = self.valve.solve_balance(self.coeffs.beta_r, b);
            qout[k] = self.valve.outflow(h[k]);
        }
        h
    }
}

impl fmt::Display for TankState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = self.shape();
        let p = &self.physical;
        let t = &self.time;
        let c = &self.coeffs;
        writeln!(f, "Tank network")?;
        writeln!(
            f,
            "  grid                 : {} x {} ({} tanks)",
            shape.rows(),
            shape.cols(),
            shape.tanks()
        )?;
        writeln!(f, "  valve law            : {}", self.valve.law.label())?;
        writeln!(f, "  valve constant Cv    : {}", p.valve_coefficient)?;
        writeln!(f, "  density rho          : {}", p.density)?;
        writeln!(f, "  initial level h0     : {}", p.initial_level)?;
        writeln!(f, "  tank height H        : {}", p.tank_height)?;
        writeln!(f, "  area A               : {}", p.area)?;
        writeln!(f, "  gravity g            : {}", p.gravity)?;
        writeln!(f, "  total time T         : {}", t.total_time)?;
        writeln!(f, "  theta                : {}", t.theta)?;
        writeln!(f, "  time steps Nt        : {}", t.time_steps)?;
        writeln!(f, "  dt                   : {}", t.dt)?;
        writeln!(f, "  coeff1 (Cv rho g)    : {}", c.coeff1)?;
        writeln!(f, "  kappa                : {}", c.kappa)?;
        writeln!(f, "  betaL                : {}", c.beta_l)?;
        writeln!(f, "  betaR                : {}", c.beta_r)?;
        writeln!(
            f,
            "  operator band        : {} rows, {} lower, {} upper",
            self.implicit.dim(),
            self.implicit.lower(),
            self.implicit.upper()
        )?;
        write!(f, "  passthrough          :")?;
        for v in self.routing.passthrough() {
            write!(f, " {v}")?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use tn_core::numeric::dot;

    fn single_tank(theta: f64, law: ValveLaw) -> TankState {
        let cfg = TankConfig {
            rows: 1,
            cols: 1,
            valve_coefficient: 0.8,
            density: 1.0,
            initial_level: 1.0,
            tank_height: 2.0,
            area: 1.0,
            gravity: 9.8,
            total_time: 0.1,
            theta,
            time_steps: 1,
            valve_law: law,
            ..TankConfig::default()
        };
        TankState::new(&cfg).unwrap()
    }

    fn step(model: &TankState, u_old: &[f64], z: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut c = vec![1.0; model.tanks()];
        let mut u_new = model.zero_state();
        model.solve_level(&mut c, &mut u_new, u_old, z).unwrap();
        (c, u_new)
    }

    #[test]
    fn explicit_limit_matches_forward_euler() {
        let model = single_tank(0.0, ValveLaw::SquareRoot);
        let u0 = model.initial_state();
        let (c, u1) = step(&model, &u0, &[0.0]);
        let expected = 1.0 - 0.1 * 0.8 * 9.8_f64.sqrt();
        assert!((u1[0] - expected).abs() < 1e-12, "{} vs {expected}", u1[0]);
        assert!(c[0].abs() < 1e-12);
    }

    #[test]
    fn implicit_limit_matches_closed_form() {
        // h + dt*Cv*sqrt(rho g h) = h0  =>  s^2 + a s - h0 = 0 with s = sqrt(h)
        let model = single_tank(1.0, ValveLaw::SquareRoot);
        let u0 = model.initial_state();
        let (c, u1) = step(&model, &u0, &[0.0]);
        let a = 0.1 * 0.8 * 9.8_f64.sqrt();
        let s = (-a + (a * a + 4.0).sqrt()) / 2.0;
        assert!((u1[0] - s * s).abs() < 1e-12, "{} vs {}", u1[0], s * s);
        assert!(c[0].abs() < 1e-12);
    }

    #[test]
    fn linear_law_limits_match_scalar_updates() {
        let k = 0.8 * 9.8;
        let explicit = single_tank(0.0, ValveLaw::Linear);
        let (_, u1) = step(&explicit, &explicit.initial_state(), &[0.0]);
        assert!((u1[0] - (1.0 - 0.1 * k)).abs() < 1e-12);

        let implicit = single_tank(1.0, ValveLaw::Linear);
        let (_, u1) = step(&implicit, &implicit.initial_state(), &[0.0]);
        assert!((u1[0] - 1.0 / (1.0 + 0.1 * k)).abs() < 1e-12);
    }

    #[test]
    fn linear_law_needs_single_banded_solve() {
        let cfg = TankConfig::default().with_law(ValveLaw::Linear);
        let model = TankState::new(&cfg).unwrap();
        let u0 = model.initial_state();
        let z = vec![0.5; model.tanks()];
        let mut c = vec![0.0; model.tanks()];
        let mut u1 = model.zero_state();
        let report = model.solve_level(&mut c, &mut u1, &u0, &z).unwrap();
        assert!(!report.corrected);
        assert!(report.residual_norm < 1e-12);
    }

    #[test]
    fn tank_emptied_in_one_step_keeps_level_non_negative() {
        // dt*Cv*sqrt(rho g) far exceeds the level: the implicit balance puts
        // the new level just above zero and never below it.
        let cfg = TankConfig {
            rows: 1,
            cols: 1,
            initial_level: 1e-4,
            total_time: 100.0,
            time_steps: 1,
            theta: 1.0,
            ..TankConfig::default()
        };
        let model = TankState::new(&cfg).unwrap();
        let u0 = model.initial_state();
        let mut c = vec![1.0];
        let mut u1 = model.zero_state();
        let report = model.solve_level(&mut c, &mut u1, &u0, &[0.0]).unwrap();
        assert!(report.corrected);
        assert!(u1[0] >= 0.0 && u1[0] < 1e-4);
        assert!(c[0].abs() <= 1e-12, "residual {}", c[0]);
        assert_eq!(report.residual_norm, c[0].abs());
    }

    #[test]
    fn non_finite_old_level_is_rejected() {
        let model = single_tank(0.5, ValveLaw::SquareRoot);
        let mut u0 = model.initial_state();
        u0[0] = f64::NAN;
        let mut c = vec![7.0];
        let mut u1 = model.zero_state();
        let err = model.solve_level(&mut c, &mut u1, &u0, &[0.0]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Solver(SolverError::ConvergenceFailed { .. })
        ));
        assert_eq!(c[0], 7.0);
        assert!(u1.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn compute_flow_fills_dependent_blocks() {
        let cfg = TankConfig::default().with_grid(2, 2);
        let model = TankState::new(&cfg).unwrap();
        let mut u = model.zero_state();
        for (k, h) in [4.0, 1.0, -1.0, 0.0].into_iter().enumerate() {
            let t = model.shape().tank(k);
            *model.h_mut(&mut u, t.row, t.col).unwrap() = h;
        }
        let z = vec![0.1, 0.2, 0.3, 0.4];
        model.compute_flow(&mut u, &z).unwrap();

        let q = |h: f64| 1e-2 * (1e3 * 9.8 * h).sqrt();
        assert!((model.qout(&u, 0, 0).unwrap() - q(4.0)).abs() < 1e-12);
        assert_eq!(model.qout(&u, 1, 0).unwrap(), 0.0);
        assert_eq!(model.qout(&u, 1, 1).unwrap(), 0.0);
        assert!((model.qin(&u, 0, 0).unwrap() - 0.1).abs() < 1e-15);
        assert!((model.qin(&u, 0, 1).unwrap() - (0.2 + 0.5 * q(4.0))).abs() < 1e-12);
        assert!((model.qin(&u, 1, 0).unwrap() - (0.3 + 0.5 * q(4.0))).abs() < 1e-12);
        assert!((model.qin(&u, 1, 1).unwrap() - (0.4 + 0.5 * q(1.0))).abs() < 1e-12);
        // level block untouched
        assert_eq!(model.h(&u, 0, 0).unwrap(), 4.0);
        assert_eq!(model.h(&u, 1, 0).unwrap(), -1.0);
    }

    #[test]
    fn wrong_lengths_fail_fast() {
        let model = TankState::new(&TankConfig::default()).unwrap();
        let u = model.initial_state();
        let mut c = vec![0.0; model.tanks()];
        let short_z = vec![0.0; model.tanks() - 1];
        assert!(matches!(
            model.value(&mut c, &u, &u, &short_z),
            Err(ModelError::LengthMismatch { what: "control", .. })
        ));
        let mut short_u = vec![0.0; 5];
        assert!(matches!(
            model.compute_flow(&mut short_u, &model.zero_control()),
            Err(ModelError::LengthMismatch { what: "state", .. })
        ));
        assert!(model.h(&u, 3, 0).is_err());
    }

    #[test]
    fn jacobians_equal_construction_operators_for_linear_law() {
        let cfg = TankConfig::default().with_law(ValveLaw::Linear);
        let model = TankState::new(&cfg).unwrap();
        let u = model.initial_state();
        let mut v = model.zero_state();
        for (k, vk) in v[..model.tanks()].iter_mut().enumerate() {
            *vk = (k as f64 * 0.37).cos();
        }
        let vh = &v[..model.tanks()];

        let mut jv = vec![0.0; model.tanks()];
        model.apply_jacobian_1_new(&mut jv, &u, &v).unwrap();
        let lv = model.implicit_operator().apply(vh).unwrap();
        for k in 0..model.tanks() {
            assert!((jv[k] - lv[k]).abs() < 1e-13);
        }

        model.apply_jacobian_1_old(&mut jv, &u, &v).unwrap();
        let rv = model.explicit_operator().apply(vh).unwrap();
        for k in 0..model.tanks() {
            assert!((jv[k] + rv[k]).abs() < 1e-13);
        }
    }

    #[test]
    fn adjoints_are_transposes() {
        let model = TankState::new(&TankConfig::default().with_grid(3, 4)).unwrap();
        let n = model.tanks();
        let mut u = model.initial_state();
        for k in 0..n {
            u[k] = 1.0 + 0.2 * k as f64;
        }
        let mut v = model.zero_state();
        for k in 0..n {
            v[k] = (k as f64).sin();
        }
        let w: Vec<f64> = (0..n).map(|k| (k as f64 * 0.5).cos()).collect();

        let mut jv = vec![0.0; n];
        let mut ajw = model.zero_state();

        model.apply_jacobian_1_old(&mut jv, &u, &v).unwrap();
        model.apply_adjoint_jacobian_1_old(&mut ajw, &u, &w).unwrap();
        assert!((dot(&jv, &w) - dot(&v, &ajw)).abs() < 1e-12);

        model.apply_jacobian_1_new(&mut jv, &u, &v).unwrap();
        model.apply_adjoint_jacobian_1_new(&mut ajw, &u, &w).unwrap();
        assert!((dot(&jv, &w) - dot(&v, &ajw)).abs() < 1e-12);
        assert!(ajw[n..].iter().all(|&x| x == 0.0));

        let vz = &v[..n];
        let mut ajz = vec![0.0; n];
        model.apply_jacobian_2(&mut jv, vz).unwrap();
        model.apply_adjoint_jacobian_2(&mut ajz, &w).unwrap();
        assert!((dot(&jv, &w) - dot(vz, &ajz)).abs() < 1e-12);
    }

    #[test]
    fn display_lists_parameters() {
        let model = TankState::new(&TankConfig::default()).unwrap();
        let dump = model.to_string();
        assert!(dump.contains("3 x 3 (9 tanks)"));
        assert!(dump.contains("square-root"));
        assert!(dump.contains("kappa"));
        assert!(dump.contains("passthrough"));
        assert!(dump.contains("9 rows, 3 lower, 0 upper"));
    }

    #[test]
    fn model_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TankState>();
    }
}
