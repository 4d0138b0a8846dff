use crate::burn_utils::{build_mlp, Sequence};
use crate::rl_algorithm::base::model::BaselineModel;
use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

#[derive(Module, Debug)]
pub struct MLPCritic<B: Backend> {
    net: Sequence<B>,
}

impl<B: Backend> MLPCritic<B> {
    pub fn forward(&self, states: Tensor<B, 2>) -> Tensor<B, 1> {
        self.net.forward(states).squeeze::<1>(1)
    }
}

impl<B: AutodiffBackend> BaselineModel<B> for MLPCritic<B> {
    fn autodiff_forward(&self, states: Tensor<B, 2>) -> Tensor<B, 1> {
        self.forward(states)
    }

    fn eval_forward(&self, states: Tensor<B::InnerBackend, 2>) -> Tensor<B::InnerBackend, 1> {
        self.valid().forward(states)
    }
}

#[derive(Config, Debug)]
pub struct MLPCriticConfig {
    observation_dim: usize,
    n_layers: usize,
    layer_size: usize,
}

impl MLPCriticConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MLPCritic<B> {
        let net = build_mlp(self.observation_dim, 1, self.n_layers, self.layer_size, device);
        MLPCritic { net }
    }
}
