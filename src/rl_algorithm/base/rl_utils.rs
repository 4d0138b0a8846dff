use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{Tensor, TensorData};
use burn::LearningRate;
use num_traits::Float;

use crate::error::{TrainError, TrainResult};
use crate::rl_algorithm::ppo::config::GaeBoundary;

pub(crate) fn update_parameters<B: AutodiffBackend, M: AutodiffModule<B>>(
    loss: Tensor<B, 1>,
    module: M,
    optimizer: &mut impl Optimizer<M, B>,
    learning_rate: LearningRate,
) -> M {
    let gradients = loss.backward();
    let gradient_params = GradientsParams::from_grads(gradients, &module);
    optimizer.step(learning_rate, module, gradient_params)
}

fn cast<F: Float>(x: f64) -> F {
    F::from(x).unwrap_or_else(F::epsilon)
}

/// Shifts to zero mean and scales by `1 / (std + 1e-8)`, using the population
/// standard deviation. A constant input maps to all zeros.
pub fn normalize<F: Float>(values: &[F]) -> Vec<F> {
    if values.is_empty() {
        return Vec::new();
    }
    let n: F = cast(values.len() as f64);
    let mean = values.iter().fold(F::zero(), |acc, x| acc + *x) / n;
    let var = values
        .iter()
        .fold(F::zero(), |acc, x| acc + (*x - mean).powi(2))
        / n;
    let denom = var.sqrt() + cast(1e-8);
    values.iter().map(|x| (*x - mean) / denom).collect()
}

#[derive(Debug, Default)]
pub struct UpdateInfo {
    pub actor_loss: f32,
    pub entropy_bonus: f32,
    pub clip_fraction: f32,
    pub approx_kl: f32,
    pub critic_loss: f32,
    pub mean_return: f32,
}

impl UpdateInfo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct GAEOutput<F> {
    /// Normalized advantages, fed to the policy update.
    pub advantages: Vec<F>,
    /// `raw_advantages[t] + values[t]`, fed to the value update.
    pub expected_returns: Vec<F>,
    /// Advantages before normalization.
    pub raw_advantages: Vec<F>,
}

/// Generalized advantage estimation over one trajectory.
///
/// `values` carries one entry per step plus the bootstrap value of the state
/// reached after the last step, so it is one longer than `rewards`.
pub fn get_gae<F: Float>(
    rewards: &[F],
    values: &[F],
    dones: &[bool],
    gamma: F,
    lambda: F,
    boundary: GaeBoundary,
) -> TrainResult<GAEOutput<F>> {
    let len = rewards.len();
    if values.len() != len + 1 || dones.len() != len {
        return Err(TrainError::Shape(format!(
            "gae expects values of len {} and dones of len {}, got {} and {}",
            len + 1,
            len,
            values.len(),
            dones.len()
        )));
    }

    let mut advantages = vec![F::zero(); len];
    let mut returns = vec![F::zero(); len];
    let mut last_gae = F::zero();
    for t in (0..len).rev() {
        let next_value = values[t + 1];
        let next_done = match boundary {
            GaeBoundary::SuccessorDone if t + 1 < len => dones[t + 1],
            GaeBoundary::SuccessorDone | GaeBoundary::Canonical => dones[t],
        };
        let not_done = if next_done { F::zero() } else { F::one() };

        let delta = rewards[t] + gamma * next_value * not_done - values[t];
        last_gae = delta + gamma * lambda * not_done * last_gae;
        advantages[t] = last_gae;
        returns[t] = last_gae + values[t];
    }

    Ok(GAEOutput {
        advantages: normalize(&advantages),
        expected_returns: returns,
        raw_advantages: advantages,
    })
}

pub fn vec2tensor1<B: Backend>(arr: Vec<f32>, device: &B::Device) -> Tensor<B, 1> {
    let shape = [arr.len()];
    Tensor::<B, 1>::from_data(TensorData::new(arr, shape), device)
}
