use burn::prelude::*;
use ndarray::Array1;

use crate::error::{TrainError, TrainResult};
use crate::rl_algorithm::base::model::{ActionSample, ValueEstimate};

/// One environment step, as recorded by the rollout collector.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: Array1<f32>,
    pub raw_action: Array1<f32>,
    pub log_prob: f32,
    pub reward: f32,
    pub done: bool,
    pub value_estimate: f32,
}

impl Transition {
    pub fn new(
        state: Array1<f32>,
        sample: ActionSample,
        reward: f32,
        done: bool,
        value: ValueEstimate,
    ) -> Self {
        Self {
            state,
            action: sample.action,
            raw_action: sample.raw_action,
            log_prob: sample.log_prob,
            reward,
            done,
            value_estimate: value.0,
        }
    }
}

/// Ordered transitions of one episode. Read-only once built.
#[derive(Debug, Clone)]
pub struct Trajectory {
    transitions: Vec<Transition>,
}

impl Trajectory {
    pub fn new(transitions: Vec<Transition>) -> TrainResult<Self> {
        if let Some(first) = transitions.first() {
            let (obs_dim, action_dim) = (first.state.len(), first.raw_action.len());
            for (i, t) in transitions.iter().enumerate() {
                if t.state.len() != obs_dim || t.raw_action.len() != action_dim {
                    return Err(TrainError::Shape(format!(
                        "transition {} has state dim {} / action dim {}, expected {} / {}",
                        i,
                        t.state.len(),
                        t.raw_action.len(),
                        obs_dim,
                        action_dim
                    )));
                }
            }
        }
        Ok(Self { transitions })
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn rewards(&self) -> Vec<f32> {
        self.transitions.iter().map(|t| t.reward).collect()
    }

    pub fn dones(&self) -> Vec<bool> {
        self.transitions.iter().map(|t| t.done).collect()
    }

    pub fn log_probs(&self) -> Vec<f32> {
        self.transitions.iter().map(|t| t.log_prob).collect()
    }

    pub fn total_reward(&self) -> f32 {
        self.transitions.iter().map(|t| t.reward).sum()
    }

    /// Per-step value estimates followed by `bootstrap`; always `len() + 1`
    /// long.
    pub fn values_with_bootstrap(&self, bootstrap: ValueEstimate) -> Vec<f32> {
        let mut values: Vec<f32> = self.transitions.iter().map(|t| t.value_estimate).collect();
        values.push(bootstrap.0);
        values
    }

    pub fn obs_dim(&self) -> usize {
        self.transitions.first().map_or(0, |t| t.state.len())
    }

    pub fn action_dim(&self) -> usize {
        self.transitions.first().map_or(0, |t| t.raw_action.len())
    }

    /// `(T, obs_dim)` batch of recorded states.
    pub fn states_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let flat: Vec<f32> = self
            .transitions
            .iter()
            .flat_map(|t| t.state.iter().copied())
            .collect();
        Tensor::from_data(TensorData::new(flat, [self.len(), self.obs_dim()]), device)
    }

    /// `(T, action_dim)` batch of pre-squash actions.
    pub fn raw_actions_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let flat: Vec<f32> = self
            .transitions
            .iter()
            .flat_map(|t| t.raw_action.iter().copied())
            .collect();
        Tensor::from_data(TensorData::new(flat, [self.len(), self.action_dim()]), device)
    }
}
