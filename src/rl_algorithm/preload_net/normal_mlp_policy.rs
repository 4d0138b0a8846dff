use crate::burn_utils::distribution::SquashedNormal;
use crate::burn_utils::{build_mlp, Sequence};
use crate::rl_algorithm::base::model::ActorModel;
use burn::module::{AutodiffModule, Param};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

const LOG_STD_MIN: f32 = -20.0;
const LOG_STD_MAX: f32 = 2.0;

/// MLP mean head with a state-independent, learnable log standard deviation.
#[derive(Module, Debug)]
pub struct NormalMLPPolicy<B: Backend> {
    mean_net: Sequence<B>,
    log_std: Param<Tensor<B, 1>>,
}

impl<B: Backend> NormalMLPPolicy<B> {
    pub fn forward(&self, states: Tensor<B, 2>) -> SquashedNormal<B> {
        let mean = self.mean_net.forward(states);
        let std = self.log_std.val().clamp(LOG_STD_MIN, LOG_STD_MAX).exp();
        SquashedNormal::new(mean, std)
    }
}

impl<B: AutodiffBackend> ActorModel<B> for NormalMLPPolicy<B> {
    fn autodiff_forward(&self, states: Tensor<B, 2>) -> SquashedNormal<B> {
        self.forward(states)
    }

    fn eval_forward(
        &self,
        states: Tensor<B::InnerBackend, 2>,
    ) -> SquashedNormal<B::InnerBackend> {
        self.valid().forward(states)
    }

    fn std_mean(&self) -> Tensor<B, 1> {
        self.log_std.val().exp().mean()
    }
}

#[derive(Config, Debug)]
pub struct NormalMLPPolicyConfig {
    action_dim: usize,
    observation_dim: usize,
    n_layers: usize,
    layer_size: usize,
    #[config(default = "-0.5")]
    init_log_std: f32,
}

impl NormalMLPPolicyConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> NormalMLPPolicy<B> {
        let mean_net: Sequence<B> = build_mlp(
            self.observation_dim,
            self.action_dim,
            self.n_layers,
            self.layer_size,
            device,
        );
        let log_std = Tensor::full([self.action_dim], self.init_log_std, device);
        NormalMLPPolicy {
            mean_net,
            log_std: Param::from_tensor(log_std),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::burn_utils::avoid_overflow::tensor_to_vec;
    use crate::burn_utils::rand::seeded_rng;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use burn::backend::Autodiff;
    use ndarray::array;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_sample_is_squashed_and_consistent() {
        let device = NdArrayDevice::default();
        let actor = NormalMLPPolicyConfig::new(2, 3, 2, 16).init::<TestBackend>(&device);
        let state = array![0.3, -0.2, 1.0];
        let sample = actor.sample(state.view(), &mut seeded_rng(3)).unwrap();
        assert_eq!(sample.action.len(), 2);
        assert!(sample.action.iter().all(|a| a.abs() <= 1.0));
        for (a, raw) in sample.action.iter().zip(sample.raw_action.iter()) {
            assert!((a - raw.tanh()).abs() < 1e-6);
        }
        for s in sample.std.iter() {
            assert!((s - (-0.5f32).exp()).abs() < 1e-6);
        }

        // re-evaluating the stored raw action reproduces the sampled log-prob
        let states = Tensor::<TestBackend, 2>::from_floats([[0.3, -0.2, 1.0]], &device);
        let raw = Tensor::<TestBackend, 2>::from_floats(
            [[sample.raw_action[0], sample.raw_action[1]]],
            &device,
        );
        let eval = actor.evaluate(states, raw);
        let log_prob = tensor_to_vec(eval.log_prob).unwrap();
        let entropy = tensor_to_vec(eval.entropy).unwrap();
        assert!((log_prob[0] - sample.log_prob).abs() < 1e-5);
        assert!((entropy[0] - sample.entropy).abs() < 1e-6);
    }

    #[test]
    fn test_std_mean() {
        let device = NdArrayDevice::default();
        let actor = NormalMLPPolicyConfig::new(3, 2, 1, 4)
            .with_init_log_std(0.0)
            .init::<TestBackend>(&device);
        let std: f32 = actor.std_mean().into_scalar();
        assert!((std - 1.0).abs() < 1e-6);
    }
}
