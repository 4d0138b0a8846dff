use burn::tensor::{backend::Backend, Tensor, TensorData};
use rand::Rng;

use crate::burn_utils::rand::standard_normal_vec;

const HALF_LOG_TWO_PI: f32 = 0.918_938_5;
// keeps log(1 - tanh(u)^2) finite when |u| is large
const SQUASH_EPS: f32 = 1e-6;

/// Diagonal Gaussian over pre-squash ("raw") actions; the environment sees
/// `tanh(raw)`.
///
/// `loc` is `(batch, action_dim)`, `scale` is the per-dimension standard
/// deviation `(action_dim)` shared across the batch.
#[derive(Debug, Clone)]
pub struct SquashedNormal<B: Backend> {
    loc: Tensor<B, 2>,
    scale: Tensor<B, 1>,
}

impl<B: Backend> SquashedNormal<B> {
    pub fn new(loc: Tensor<B, 2>, scale: Tensor<B, 1>) -> Self {
        Self { loc, scale }
    }

    pub fn loc(&self) -> Tensor<B, 2> {
        self.loc.clone()
    }

    pub fn scale(&self) -> Tensor<B, 1> {
        self.scale.clone()
    }

    fn batch_scale(&self) -> Tensor<B, 2> {
        let batch_size = self.loc.shape().dims[0];
        self.scale.clone().unsqueeze::<2>().repeat_dim(0, batch_size)
    }

    /// Draws raw actions `loc + scale * z` with `z` taken from `rng`.
    pub fn sample_raw<R: Rng + ?Sized>(&self, rng: &mut R) -> Tensor<B, 2> {
        let shape = self.loc.shape();
        let noise = standard_normal_vec(rng, shape.num_elements());
        let noise: Tensor<B, 2> = Tensor::<B, 1>::from_data(
            TensorData::new(noise, [shape.num_elements()]),
            &self.loc.device(),
        )
        .reshape(shape);
        self.loc.clone() + noise * self.batch_scale()
    }

    pub fn squash(raw: Tensor<B, 2>) -> Tensor<B, 2> {
        raw.tanh()
    }

    /// Per-dimension Gaussian log-density of raw actions, no squash term.
    pub fn gaussian_log_prob(&self, raw: Tensor<B, 2>) -> Tensor<B, 2> {
        let scale = self.batch_scale();
        let z = (raw - self.loc.clone()) / scale.clone();
        z.powf_scalar(2.0).mul_scalar(-0.5) - scale.log() - HALF_LOG_TWO_PI
    }

    /// Log-probability of the squashed action produced by `raw`, summed over
    /// action dimensions. Includes the tanh change-of-variables correction.
    pub fn log_prob(&self, raw: Tensor<B, 2>) -> Tensor<B, 1> {
        let squashed = raw.clone().tanh();
        let correction = (squashed.powf_scalar(2.0).neg().add_scalar(1.0 + SQUASH_EPS)).log();
        let per_dim = self.gaussian_log_prob(raw) - correction;
        per_dim.sum_dim(1).squeeze::<1>(1)
    }

    /// Entropy of the underlying Gaussian, one value per batch row.
    pub fn entropy(&self) -> Tensor<B, 1> {
        let per_dim = self.batch_scale().log().add_scalar(0.5 + HALF_LOG_TWO_PI);
        per_dim.sum_dim(1).squeeze::<1>(1)
    }

    pub fn mean_action(&self) -> Tensor<B, 2> {
        self.loc.clone().tanh()
    }
}
