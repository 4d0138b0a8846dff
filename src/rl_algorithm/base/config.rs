use burn::{config::Config, grad_clipping::GradientClippingConfig};

use crate::{rl_algorithm::ppo::config::PPOTrainingConfig, rl_env::config::EnvConfig};

#[derive(Config)]
pub struct TrainConfig {
    #[config(default = "PPOTrainingConfig::new()")]
    pub ppo_train_config: PPOTrainingConfig,
    #[config(default = "EnvConfig::new()")]
    pub env_config: EnvConfig,
    #[config(default = 500)]
    pub train_episodes: usize,
    /// Episodes per rolling-average reward report.
    #[config(default = 10)]
    pub reward_window: usize,
    #[config(default = "String::from(\"./ckpt\")")]
    pub ckpt_save_path: String,
    /// Tensorboard summaries are written here when set.
    pub log_dir: Option<String>,
    #[config(default = 42)]
    pub seed: u64,
    #[config(default = "Some(GradientClippingConfig::Norm(1.0))")]
    pub grad_clip: Option<GradientClippingConfig>,
    #[config(default = 2)]
    pub actor_n_layers: usize,
    #[config(default = 64)]
    pub actor_layer_size: usize,
    #[config(default = 2)]
    pub critic_n_layers: usize,
    #[config(default = 64)]
    pub critic_layer_size: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self::new()
    }
}
