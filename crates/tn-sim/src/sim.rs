//! Simulation runner and result recording.

use crate::error::{SimError, SimResult};
use crate::schedule::ControlSchedule;
use rayon::prelude::*;
use tn_core::{Block, norm_inf};
use tn_model::TankState;

/// Options for simulation runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Number of steps; `None` runs the model's configured step count
    pub steps: Option<usize>,
    /// Record every N-th step (decimation)
    pub record_every: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            steps: None,
            record_every: 1,
        }
    }
}

/// Record of simulation results.
#[derive(Clone, Debug)]
pub struct SimRecord {
    /// Time points (seconds)
    pub t: Vec<f64>,
    /// State snapshots
    pub x: Vec<Vec<f64>>,
    /// Stored volume at each recorded time
    pub volume: Vec<f64>,
    /// Residual max-norm after every step (not decimated)
    pub residual_norms: Vec<f64>,
    /// Steps finished by substitution after the banded predictor missed
    pub corrected_steps: usize,
    /// Steps after which some level exceeded the tank height
    pub overflow_steps: usize,
}

impl SimRecord {
    pub fn final_state(&self) -> Option<&[f64]> {
        self.x.last().map(Vec::as_slice)
    }

    pub fn max_residual(&self) -> f64 {
        self.residual_norms.iter().fold(0.0, |m, r| m.max(*r))
    }
}

/// March `model` from `u0` under `schedule`.
///
/// Only the level block of `u0` is used; flows are recomputed from it and
/// the first control so every recorded state is self-consistent.
pub fn run_sim(
    model: &TankState,
    u0: &[f64],
    schedule: &ControlSchedule,
    opts: &SimOptions,
) -> SimResult<SimRecord> {
    if opts.record_every == 0 {
        return Err(SimError::InvalidArg {
            what: "record_every must be positive".to_string(),
        });
    }
    let layout = model.layout();
    if u0.len() != layout.state_len() {
        return Err(SimError::InvalidArg {
            what: format!(
                "initial state has {} entries, expected {}",
                u0.len(),
                layout.state_len()
            ),
        });
    }
    schedule.validate(model.tanks())?;

    let steps = opts.steps.unwrap_or(model.time().time_steps);
    let dt = model.time().dt;
    let tank_height = model.physical().tank_height;

    let mut x = u0.to_vec();
    model.compute_flow(&mut x, schedule.control(0))?;

    let mut rec = SimRecord {
        t: vec![0.0],
        volume: vec![model.total_volume(&x)?],
        x: vec![x.clone()],
        residual_norms: Vec::with_capacity(steps),
        corrected_steps: 0,
        overflow_steps: 0,
    };

    let mut c = model.zero_control();
    let mut next = model.zero_state();
    for step in 0..steps {
        let report = model
            .solve_level(&mut c, &mut next, &x, schedule.control(step))
            .map_err(|source| SimError::Step { step, source })?;
        std::mem::swap(&mut x, &mut next);

        rec.residual_norms.push(report.residual_norm);
        rec.corrected_steps += usize::from(report.corrected);

        let peak = norm_inf(layout.block(&x, Block::Level)?);
        if peak > tank_height {
            if rec.overflow_steps == 0 {
                tracing::warn!(
                    step,
                    level = peak,
                    tank_height,
                    "level exceeds tank height; overflow is not modelled"
                );
            }
            rec.overflow_steps += 1;
        }

        let done = step + 1;
        if done % opts.record_every == 0 || done == steps {
            rec.t.push(done as f64 * dt);
            rec.volume.push(model.total_volume(&x)?);
            rec.x.push(x.clone());
        }
    }

    tracing::debug!(
        steps,
        recorded = rec.t.len(),
        corrected_steps = rec.corrected_steps,
        max_residual = rec.max_residual(),
        "trajectory complete"
    );

    Ok(rec)
}

/// Run several schedules against the same model in parallel.
///
/// Results keep the order of `schedules`.
pub fn run_batch(
    model: &TankState,
    u0: &[f64],
    schedules: &[ControlSchedule],
    opts: &SimOptions,
) -> Vec<SimResult<SimRecord>> {
    schedules
        .par_iter()
        .map(|s| run_sim(model, u0, s, opts))
        .collect()
}
