use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use log::info;

use crate::error::TrainResult;
use crate::rl_algorithm::base::config::TrainConfig;
use crate::rl_algorithm::base::on_policy_runner::{OnPolicyRunner, TrainSummary};
use crate::rl_algorithm::base::EpochLogger;
use crate::rl_algorithm::preload_net::mlp_critic::MLPCriticConfig;
use crate::rl_algorithm::preload_net::normal_mlp_policy::NormalMLPPolicyConfig;
use crate::rl_env::env::RobotEnv;

type MyBackend = Autodiff<NdArray>;

/// Trains a fresh actor/critic pair on `ENV` with PPO and saves the policy.
pub fn train_network<ENV: RobotEnv>(config: TrainConfig) -> TrainResult<TrainSummary> {
    let device = NdArrayDevice::default();
    let mut logger = match config.log_dir.as_deref() {
        Some(dir) => EpochLogger::with_writer(dir),
        None => EpochLogger::new(),
    };
    let actor_config = (config.actor_n_layers, config.actor_layer_size);
    let critic_config = (config.critic_n_layers, config.critic_layer_size);

    let mut runner = OnPolicyRunner::<ENV, MyBackend>::new(device, config, "ppo")?;
    let ob_dim = runner.env().get_obs_dim();
    let action_dim = runner.env().get_action_dim();
    info!("ob_dim={}, action_dim={}", ob_dim, action_dim);

    let actor_net = NormalMLPPolicyConfig::new(action_dim, ob_dim, actor_config.0, actor_config.1)
        .init::<MyBackend>(&device);
    let baseline_net =
        MLPCriticConfig::new(ob_dim, critic_config.0, critic_config.1).init::<MyBackend>(&device);
    info!("actor_net={}", actor_net);
    info!("baseline_net={}", baseline_net);

    let (_, _, summary) = runner.train_update(actor_net, baseline_net, &mut logger)?;
    Ok(summary)
}
