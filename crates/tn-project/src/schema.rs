//! Project schema definitions.

use serde::{Deserialize, Serialize};
use tn_model::{ModelResult, TankConfig, TankState};
use tn_sim::{ControlSchedule, SimOptions};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub model: TankConfig,
    /// Inflow schedule; omitted means no external inflow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controls: Option<ControlSchedule>,
    #[serde(default)]
    pub run: RunDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RunDef {
    pub record_every: usize,
    /// Overrides the model's step count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<usize>,
    /// Per-tank starting levels, row-major; defaults to the model's h0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_levels: Option<Vec<f64>>,
}

impl Default for RunDef {
    fn default() -> Self {
        Self {
            record_every: 1,
            steps: None,
            initial_levels: None,
        }
    }
}

impl Project {
    pub fn new(name: impl Into<String>, model: TankConfig) -> Self {
        Self {
            version: crate::LATEST_VERSION,
            name: name.into(),
            model,
            controls: None,
            run: RunDef::default(),
        }
    }

    pub fn build_model(&self) -> ModelResult<TankState> {
        TankState::new(&self.model)
    }

    pub fn schedule(&self, tanks: usize) -> ControlSchedule {
        self.controls
            .clone()
            .unwrap_or_else(|| ControlSchedule::zero(tanks))
    }

    pub fn sim_options(&self) -> SimOptions {
        SimOptions {
            steps: self.run.steps,
            record_every: self.run.record_every,
        }
    }

    /// Starting state vector for `model`, with flows left for the runner.
    pub fn initial_state(&self, model: &TankState) -> Vec<f64> {
        match &self.run.initial_levels {
            Some(levels) => {
                let mut u = model.zero_state();
                for (slot, h) in u[..model.tanks()].iter_mut().zip(levels) {
                    *slot = *h;
                }
                u
            }
            None => model.initial_state(),
        }
    }
}
