use std::marker::PhantomData;

use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::Optimizer;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use log::trace;

use crate::burn_utils::avoid_overflow::{check_tensor_finite, tensor_to_vec};
use crate::error::TrainResult;
use crate::rl_algorithm::base::memory::Trajectory;
use crate::rl_algorithm::base::model::{ActorModel, BaselineModel, ValueEstimate};
use crate::rl_algorithm::base::rl_utils::{self, vec2tensor1, GAEOutput, UpdateInfo};
use crate::rl_algorithm::base::{EpochLogger, EpochLoggerAggMode};
use crate::rl_algorithm::ppo::config::PPOTrainingConfig;

/// Everything the two updates need from one episode, on the training device.
pub struct PPOBatch<B: Backend> {
    pub states: Tensor<B, 2>,
    pub raw_actions: Tensor<B, 2>,
    pub old_log_probs: Tensor<B, 1>,
    pub advantages: Tensor<B, 1>,
    pub returns: Tensor<B, 1>,
}

impl<B: Backend> PPOBatch<B> {
    pub fn new(trajectory: &Trajectory, gae: GAEOutput<f32>, device: &B::Device) -> Self {
        Self {
            states: trajectory.states_tensor(device),
            raw_actions: trajectory.raw_actions_tensor(device),
            old_log_probs: vec2tensor1(trajectory.log_probs(), device),
            advantages: vec2tensor1(gae.advantages, device),
            returns: vec2tensor1(gae.expected_returns, device),
        }
    }
}

pub struct PolicyLoss<B: Backend> {
    /// `-mean(min(r * A, clip(r) * A)) - coef * mean(entropy)`
    pub loss: Tensor<B, 1>,
    pub clipped_objective: f32,
    pub unclipped_objective: f32,
    pub entropy_bonus: f32,
    pub clip_fraction: f32,
    pub approx_kl: f32,
}

/// PPO clipped-surrogate loss with entropy bonus.
///
/// Fails with a numeric-validity error when a log-probability or a ratio is
/// not finite; no loss is produced in that case.
pub fn clipped_surrogate_loss<B: Backend>(
    log_probs: Tensor<B, 1>,
    old_log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
    entropy: Tensor<B, 1>,
    entropy_coef: f32,
    epsilon_clip: f32,
) -> TrainResult<PolicyLoss<B>> {
    check_tensor_finite("log_prob", &log_probs)?;
    let log_ratio = log_probs - old_log_probs;
    let ratio = log_ratio.clone().exp();
    check_tensor_finite("ratio", &ratio)?;

    let clipped_ratio = ratio
        .clone()
        .clamp(1.0 - epsilon_clip, 1.0 + epsilon_clip);
    let unclipped = ratio.clone() * advantages.clone();
    let clipped = clipped_ratio * advantages;
    let surrogate = unclipped.clone().min_pair(clipped).mean();
    let entropy_bonus = entropy.mean();
    let loss = surrogate.clone().neg() - entropy_bonus.clone().mul_scalar(entropy_coef);

    let ratios = tensor_to_vec(ratio)?;
    let n = ratios.len().max(1) as f32;
    let clip_fraction = ratios
        .iter()
        .filter(|r| (*r - 1.0).abs() > epsilon_clip)
        .count() as f32
        / n;
    let approx_kl = -tensor_to_vec(log_ratio)?.iter().sum::<f32>() / n;

    Ok(PolicyLoss {
        loss,
        clipped_objective: surrogate.into_scalar().elem::<f32>(),
        unclipped_objective: unclipped.mean().into_scalar().elem::<f32>(),
        entropy_bonus: entropy_bonus.into_scalar().elem::<f32>(),
        clip_fraction,
        approx_kl,
    })
}

/// Mean squared error between value predictions and return targets.
pub fn value_loss<B: Backend>(values: Tensor<B, 1>, returns: Tensor<B, 1>) -> Tensor<B, 1> {
    MseLoss::new().forward(values, returns, Reduction::Mean)
}

pub struct PPO<B: AutodiffBackend, AM: ActorModel<B>, BM: BaselineModel<B>> {
    backend: PhantomData<B>,
    actor: PhantomData<AM>,
    baseline_net: PhantomData<BM>,
}

impl<B: AutodiffBackend, AM: ActorModel<B>, BM: BaselineModel<B>> PPO<B, AM, BM> {
    /// One clipped policy-gradient step over the whole episode.
    pub fn update_actor(
        actor_net: AM,
        batch: &PPOBatch<B>,
        entropy_coef: f32,
        actor_optimizer: &mut impl Optimizer<AM, B>,
        config: &PPOTrainingConfig,
    ) -> TrainResult<(AM, PolicyLoss<B>)> {
        let evaluation = actor_net.evaluate(batch.states.clone(), batch.raw_actions.clone());
        trace!("logprobs={}", evaluation.log_prob);
        let policy_loss = clipped_surrogate_loss(
            evaluation.log_prob,
            batch.old_log_probs.clone(),
            batch.advantages.clone(),
            evaluation.entropy,
            entropy_coef,
            config.epsilon_clip,
        )?;
        let actor_net = rl_utils::update_parameters(
            policy_loss.loss.clone(),
            actor_net,
            actor_optimizer,
            config.actor_learning_rate,
        );
        Ok((actor_net, policy_loss))
    }

    /// One regression step of the critic towards the GAE returns.
    pub fn update_baseline(
        baseline_net: BM,
        batch: &PPOBatch<B>,
        baseline_optimizer: &mut impl Optimizer<BM, B>,
        config: &PPOTrainingConfig,
    ) -> (BM, f32) {
        let pred = baseline_net.autodiff_forward(batch.states.clone());
        let loss = value_loss(pred, batch.returns.clone());
        let loss_val = loss.clone().into_scalar().elem::<f32>();
        let baseline_net = rl_utils::update_parameters(
            loss,
            baseline_net,
            baseline_optimizer,
            config.critic_learning_rate,
        );
        (baseline_net, loss_val)
    }

    /// Advantage estimation followed by the policy step and then the value
    /// step. The value step never influences this episode's policy gradient.
    #[allow(clippy::too_many_arguments)]
    pub fn train(
        actor_net: AM,
        baseline_net: BM,
        trajectory: &Trajectory,
        bootstrap: ValueEstimate,
        entropy_coef: f32,
        actor_optimizer: &mut impl Optimizer<AM, B>,
        baseline_optimizer: &mut impl Optimizer<BM, B>,
        config: &PPOTrainingConfig,
        device: &B::Device,
        logger: &mut EpochLogger,
    ) -> TrainResult<(AM, BM, UpdateInfo)> {
        let values = trajectory.values_with_bootstrap(bootstrap);
        let gae = rl_utils::get_gae(
            &trajectory.rewards(),
            &values,
            &trajectory.dones(),
            config.gae_gamma,
            config.gae_lambda,
            config.gae_boundary,
        )?;
        trace!("returns={:?}", gae.expected_returns);
        trace!("advantages={:?}", gae.advantages);
        trace!("values={:?}", values);

        let mut update_info = UpdateInfo::new();
        update_info.mean_return =
            gae.expected_returns.iter().sum::<f32>() / gae.expected_returns.len().max(1) as f32;

        let batch = PPOBatch::<B>::new(trajectory, gae, device);
        let (actor_net, policy_loss) =
            Self::update_actor(actor_net, &batch, entropy_coef, actor_optimizer, config)?;
        let (baseline_net, critic_loss) =
            Self::update_baseline(baseline_net, &batch, baseline_optimizer, config);

        update_info.actor_loss = policy_loss.loss.into_scalar().elem::<f32>();
        update_info.entropy_bonus = policy_loss.entropy_bonus;
        update_info.clip_fraction = policy_loss.clip_fraction;
        update_info.approx_kl = policy_loss.approx_kl;
        update_info.critic_loss = critic_loss;

        logger.add_scalar(("train", "actor_loss"), update_info.actor_loss);
        logger.add_scalar(("train", "entropy_bonus"), update_info.entropy_bonus);
        logger.add_scalar(("train", "entropy_coef"), entropy_coef);
        logger.add_scalar(("train", "clip_fraction"), update_info.clip_fraction);
        logger.add_scalar(("train", "approx_kl"), update_info.approx_kl);
        logger.add_scalar(("train", "critic_loss"), update_info.critic_loss);
        logger.add_scalar_agg(
            ("train", "mean_return"),
            update_info.mean_return,
            EpochLoggerAggMode::Replace,
        );
        Ok((actor_net, baseline_net, update_info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrainError;
    use crate::rl_algorithm::base::memory::tests::transition;
    use crate::rl_algorithm::preload_net::mlp_critic::MLPCriticConfig;
    use crate::rl_algorithm::preload_net::normal_mlp_policy::NormalMLPPolicyConfig;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use burn::backend::Autodiff;
    use burn::module::AutodiffModule;
    use burn::optim::AdamConfig;
    use ndarray::array;

    type TestBackend = Autodiff<NdArray>;

    fn t1(values: &[f32]) -> Tensor<NdArray, 1> {
        vec2tensor1(values.to_vec(), &NdArrayDevice::default())
    }

    #[test]
    fn test_clip_is_inert_inside_trust_region() {
        let old = [-1.0, -0.5, -2.0, -0.1];
        // every ratio within 5% of 1
        let new = [-0.98, -0.52, -1.97, -0.13];
        let adv = [1.0, -2.0, 0.5, -0.3];
        let out = clipped_surrogate_loss(
            t1(&new),
            t1(&old),
            t1(&adv),
            t1(&[1.0; 4]),
            0.0,
            0.2,
        )
        .unwrap();
        assert!((out.clipped_objective - out.unclipped_objective).abs() < 1e-6);
        assert_eq!(out.clip_fraction, 0.0);
        let loss: f32 = out.loss.into_scalar();
        assert!((loss + out.unclipped_objective).abs() < 1e-6);
    }

    #[test]
    fn test_clip_limits_large_ratio() {
        // ratio = e^1 with a positive advantage: objective capped at 1.2 * A
        let out = clipped_surrogate_loss(
            t1(&[0.0]),
            t1(&[-1.0]),
            t1(&[2.0]),
            t1(&[0.0]),
            0.0,
            0.2,
        )
        .unwrap();
        assert!((out.clipped_objective - 2.4).abs() < 1e-5);
        assert_eq!(out.clip_fraction, 1.0);
    }

    #[test]
    fn test_entropy_bonus_lowers_loss() {
        let base = clipped_surrogate_loss(t1(&[0.0]), t1(&[0.0]), t1(&[1.0]), t1(&[2.0]), 0.0, 0.2)
            .unwrap();
        let with_bonus =
            clipped_surrogate_loss(t1(&[0.0]), t1(&[0.0]), t1(&[1.0]), t1(&[2.0]), 0.5, 0.2)
                .unwrap();
        let base: f32 = base.loss.into_scalar();
        let with_bonus: f32 = with_bonus.loss.into_scalar();
        assert!((base - with_bonus - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_log_prob_fails() {
        let res = clipped_surrogate_loss(
            t1(&[-1.0, f32::NAN]),
            t1(&[-1.0, -1.0]),
            t1(&[1.0, 1.0]),
            t1(&[0.0, 0.0]),
            0.01,
            0.2,
        );
        match res {
            Err(TrainError::NumericValidity { quantity, index, .. }) => {
                assert_eq!(quantity, "log_prob");
                assert_eq!(index, 1);
            }
            _ => panic!("expected numeric-validity failure"),
        }
    }

    #[test]
    fn test_overflowing_ratio_fails() {
        let res = clipped_surrogate_loss(
            t1(&[200.0]),
            t1(&[-200.0]),
            t1(&[1.0]),
            t1(&[0.0]),
            0.01,
            0.2,
        );
        match res {
            Err(TrainError::NumericValidity { quantity, .. }) => assert_eq!(quantity, "ratio"),
            _ => panic!("expected ratio failure"),
        }
    }

    #[test]
    fn test_value_loss_is_mse() {
        let loss: f32 = value_loss(t1(&[1.0, 2.0, 3.0]), t1(&[1.0, 0.0, 6.0])).into_scalar();
        assert!((loss - (0.0 + 4.0 + 9.0) / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_train_step_updates_both_networks() {
        let device = NdArrayDevice::default();
        let actor = NormalMLPPolicyConfig::new(2, 2, 1, 8).init::<TestBackend>(&device);
        let critic = MLPCriticConfig::new(2, 1, 8).init::<TestBackend>(&device);
        let mut actor_opt = AdamConfig::new().init::<TestBackend, _>();
        let mut critic_opt = AdamConfig::new().init::<TestBackend, _>();
        let trajectory = Trajectory::new(vec![
            transition(array![0.0, 1.0], 1.0, false, 0.0),
            transition(array![0.5, -1.0], 0.0, false, 0.0),
            transition(array![1.0, 0.0], 2.0, true, 0.0),
        ])
        .unwrap();
        let states = trajectory.states_tensor::<NdArray>(&device);
        let before: Vec<f32> = tensor_to_vec(critic.valid().forward(states.clone())).unwrap();

        let mut logger = EpochLogger::new();
        let config = PPOTrainingConfig::new().with_critic_learning_rate(1e-2);
        let (_actor, critic, info) = PPO::train(
            actor,
            critic,
            &trajectory,
            ValueEstimate(0.0),
            0.01,
            &mut actor_opt,
            &mut critic_opt,
            &config,
            &device,
            &mut logger,
        )
        .unwrap();
        let after: Vec<f32> = tensor_to_vec(critic.valid().forward(states)).unwrap();
        assert_ne!(before, after);
        assert!(info.actor_loss.is_finite());
        assert!(info.critic_loss > 0.0);
        assert_eq!(logger.get(("train", "entropy_coef")), Some(0.01));
    }

    #[test]
    fn test_unstable_policy_halts_update() {
        let device = NdArrayDevice::default();
        let actor = NormalMLPPolicyConfig::new(2, 2, 1, 8).init::<TestBackend>(&device);
        let critic = MLPCriticConfig::new(2, 1, 8).init::<TestBackend>(&device);
        let mut actor_opt = AdamConfig::new().init::<TestBackend, _>();
        let mut critic_opt = AdamConfig::new().init::<TestBackend, _>();
        let mut bad = transition(array![0.0, 1.0], 1.0, true, 0.0);
        bad.log_prob = f32::NEG_INFINITY;
        let trajectory = Trajectory::new(vec![bad]).unwrap();
        let res = PPO::train(
            actor,
            critic,
            &trajectory,
            ValueEstimate(0.0),
            0.01,
            &mut actor_opt,
            &mut critic_opt,
            &PPOTrainingConfig::new(),
            &device,
            &mut EpochLogger::new(),
        );
        assert!(matches!(res, Err(ref e) if e.is_numeric_failure()));
    }
}
