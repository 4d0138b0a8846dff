use burn::config::Config;

/// Which `done` flag masks the bootstrap at the last step of a trajectory.
#[derive(Config, Debug, PartialEq, Eq, Copy)]
pub enum GaeBoundary {
    /// Step `t` is masked with `done[t + 1]`, and the final step with its own
    /// `done[T - 1]`. Reproduces the historical training runs bit for bit.
    SuccessorDone,
    /// Step `t` is masked with `done[t]`: bootstrapping stops exactly where
    /// the episode terminated.
    Canonical,
}

#[derive(Config, Debug)]
pub struct PPOTrainingConfig {
    #[config(default = 0.99)]
    pub gae_gamma: f32,
    #[config(default = 0.95)]
    pub gae_lambda: f32,
    #[config(default = 0.2)]
    pub epsilon_clip: f32,
    #[config(default = 3e-4)]
    pub actor_learning_rate: f64,
    #[config(default = 3e-4)]
    pub critic_learning_rate: f64,
    #[config(default = 1e-4)]
    pub min_entropy: f32,
    #[config(default = 1e-2)]
    pub max_entropy: f32,
    /// Declared for compatibility with older configs. The update consumes the
    /// whole episode as one batch, exactly once; this value is never read.
    #[config(default = 32)]
    pub batch_size: usize,
    #[config(default = "GaeBoundary::SuccessorDone")]
    pub gae_boundary: GaeBoundary,
}

impl Default for PPOTrainingConfig {
    fn default() -> Self {
        Self::new()
    }
}
