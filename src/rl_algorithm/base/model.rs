use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use ndarray::{Array1, ArrayView1};
use rand::Rng;

use crate::burn_utils::avoid_overflow::tensor_to_vec;
use crate::burn_utils::distribution::SquashedNormal;
use crate::error::TrainResult;

/// One draw from the policy for a single state.
#[derive(Debug, Clone)]
pub struct ActionSample {
    /// Squashed action passed to the environment.
    pub action: Array1<f32>,
    /// Gaussian draw before squashing; kept so the update can re-evaluate
    /// exactly the same point.
    pub raw_action: Array1<f32>,
    pub log_prob: f32,
    pub entropy: f32,
    pub std: Array1<f32>,
}

/// Critic output for a single state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueEstimate(pub f32);

/// Re-evaluation of stored raw actions under the current policy parameters.
pub struct PolicyEvaluation<B: Backend> {
    pub log_prob: Tensor<B, 1>,
    pub entropy: Tensor<B, 1>,
}

fn single_state<B: Backend>(state: ArrayView1<f32>, device: &B::Device) -> Tensor<B, 2> {
    let dim = state.len();
    let data = TensorData::new(state.iter().copied().collect::<Vec<f32>>(), [1, dim]);
    Tensor::from_data(data, device)
}

// for predicting the action distribution
pub trait ActorModel<B: AutodiffBackend>: AutodiffModule<B> {
    fn autodiff_forward(&self, states: Tensor<B, 2>) -> SquashedNormal<B>;

    fn eval_forward(
        &self,
        states: Tensor<B::InnerBackend, 2>,
    ) -> SquashedNormal<B::InnerBackend>;

    fn std_mean(&self) -> Tensor<B, 1>;

    /// Samples an action for one state without tracking gradients.
    fn sample<R: Rng + ?Sized>(
        &self,
        state: ArrayView1<f32>,
        rng: &mut R,
    ) -> TrainResult<ActionSample> {
        let device = self.devices()[0].clone();
        let dist = self.eval_forward(single_state::<B::InnerBackend>(state, &device));
        let raw = dist.sample_raw(rng);
        let action = SquashedNormal::squash(raw.clone());
        let log_prob = tensor_to_vec(dist.log_prob(raw.clone()))?;
        let entropy = tensor_to_vec(dist.entropy())?;
        Ok(ActionSample {
            action: Array1::from(tensor_to_vec(action)?),
            raw_action: Array1::from(tensor_to_vec(raw)?),
            log_prob: log_prob[0],
            entropy: entropy[0],
            std: Array1::from(tensor_to_vec(dist.scale())?),
        })
    }

    /// Recomputes log-probability and entropy of `raw_actions` with gradients
    /// attached, for the policy update.
    fn evaluate(&self, states: Tensor<B, 2>, raw_actions: Tensor<B, 2>) -> PolicyEvaluation<B> {
        let dist = self.autodiff_forward(states);
        PolicyEvaluation {
            log_prob: dist.log_prob(raw_actions),
            entropy: dist.entropy(),
        }
    }
}

// for predicting values of states
pub trait BaselineModel<B: AutodiffBackend>: AutodiffModule<B> {
    fn autodiff_forward(&self, states: Tensor<B, 2>) -> Tensor<B, 1>;

    fn eval_forward(&self, states: Tensor<B::InnerBackend, 2>) -> Tensor<B::InnerBackend, 1>;

    fn estimate(&self, state: ArrayView1<f32>) -> TrainResult<ValueEstimate> {
        let device = self.devices()[0].clone();
        let states = single_state::<B::InnerBackend>(state, &device);
        let values = tensor_to_vec(self.eval_forward(states))?;
        Ok(ValueEstimate(values[0]))
    }
}
