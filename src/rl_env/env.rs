use std::collections::BTreeMap;

use ndarray::{Array1, ArrayView1};

use super::config::EnvConfig;
use crate::error::EnvError;

#[derive(Default, Debug, Clone)]
pub struct StepInfo {
    pub next_obs: Array1<f32>,
    pub reward: f32,
    pub done: bool,
    pub info: BTreeMap<String, f32>,
}

/// A simulated robot. `step` blocks until the simulator has advanced; the
/// training code applies no timeout.
pub trait RobotEnv {
    fn new(env_conf: EnvConfig) -> Self
    where
        Self: Sized;

    /// Starts a new episode and returns its initial observation.
    fn reset(&mut self) -> Result<Array1<f32>, EnvError>;

    /// Applies `action`. `done` is only ever set on the last step of an
    /// episode.
    fn step(&mut self, action: ArrayView1<f32>) -> Result<StepInfo, EnvError>;

    fn get_obs_dim(&self) -> usize;

    fn get_action_dim(&self) -> usize;
}
