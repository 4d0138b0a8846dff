use std::collections::VecDeque;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use burn::{
    config::Config,
    optim::AdamConfig,
    record::{DefaultFileRecorder, FullPrecisionSettings},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use chrono::Utc;
use chrono_tz::Asia::Shanghai;
use log::{info, warn};

use crate::error::{TrainError, TrainResult};
use crate::rl_algorithm::ppo::config::GaeBoundary;
use crate::rl_algorithm::ppo::entropy::EntropyScheduler;
use crate::rl_algorithm::ppo::ppo_agent::PPO;
use crate::rl_env::env::RobotEnv;
use crate::rl_env::env_sampler::RolloutCollector;

use super::{
    config::TrainConfig,
    model::{ActorModel, BaselineModel},
    EpochLogger,
};

/// What a finished run reports back to its caller.
#[derive(Debug, Clone, Default)]
pub struct TrainSummary {
    pub episode_rewards: Vec<f32>,
    /// `(episodes_done, mean reward over the last window)`.
    pub rolling_averages: Vec<(usize, f32)>,
    /// Episodes whose rollout held no usable step and got no update.
    pub skipped_updates: usize,
    pub aborted_episodes: usize,
    pub policy_path: PathBuf,
}

/// Runs episodes on a single environment and applies one PPO update per
/// episode.
pub struct OnPolicyRunner<E: RobotEnv, B: AutodiffBackend> {
    device: B::Device,
    backend: PhantomData<B>,
    env: E,
    collector: RolloutCollector,
    config: TrainConfig,
    exp_name: String,
    exp_base_path: PathBuf,
}

impl<E: RobotEnv, B: AutodiffBackend> OnPolicyRunner<E, B> {
    pub fn new(device: B::Device, config: TrainConfig, algo_name: &str) -> TrainResult<Self> {
        let env = E::new(config.env_config.clone());
        Self::with_env(device, env, config, algo_name)
    }

    /// Same as [`OnPolicyRunner::new`] for an environment that is already
    /// constructed.
    pub fn with_env(
        device: B::Device,
        env: E,
        config: TrainConfig,
        algo_name: &str,
    ) -> TrainResult<Self> {
        let env_name = std::any::type_name::<E>()
            .rsplit("::")
            .next()
            .unwrap_or("env");
        let exp_name = format!(
            "{}_{}_{}",
            algo_name,
            env_name,
            Utc::now().with_timezone(&Shanghai).format("%m-%d_%H-%M-%S")
        );
        let exp_base_path = Path::new(&config.ckpt_save_path).join(&exp_name);
        std::fs::create_dir_all(&exp_base_path)?;
        config.save(exp_base_path.join("config.json"))?;
        info!(
            "experiment {} obs_dim={} action_dim={}",
            exp_name,
            env.get_obs_dim(),
            env.get_action_dim()
        );

        Ok(Self {
            device,
            backend: PhantomData,
            env,
            collector: RolloutCollector::new(config.seed),
            config,
            exp_name,
            exp_base_path,
        })
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn exp_name(&self) -> &str {
        &self.exp_name
    }

    pub fn exp_base_path(&self) -> &Path {
        &self.exp_base_path
    }

    pub fn train_update<AM, BM>(
        &mut self,
        mut actor_net: AM,
        mut baseline_net: BM,
        logger: &mut EpochLogger,
    ) -> TrainResult<(AM, BM, TrainSummary)>
    where
        AM: ActorModel<B>,
        BM: BaselineModel<B>,
    {
        let ppo_config = self.config.ppo_train_config.clone();
        if ppo_config.gae_boundary == GaeBoundary::SuccessorDone {
            warn!(
                "GAE masks each step with the successor's done flag; \
                 set gae_boundary to Canonical for the textbook recursion"
            );
        }
        let scheduler = EntropyScheduler::from_config(&ppo_config);
        let mut actor_optimizer = AdamConfig::new()
            .with_grad_clipping(self.config.grad_clip.clone())
            .init::<B, AM>();
        let mut baseline_optimizer = AdamConfig::new()
            .with_grad_clipping(self.config.grad_clip.clone())
            .init::<B, BM>();

        let train_episodes = self.config.train_episodes;
        let reward_window = self.config.reward_window;
        let mut recent_rewards = VecDeque::with_capacity(reward_window);
        let mut summary = TrainSummary::default();

        for episode in 0..train_episodes {
            let obs = self.env.reset()?;
            let rollout =
                self.collector
                    .collect(&mut self.env, obs, &actor_net, &baseline_net, logger)?;
            let episode_reward = rollout.trajectory.total_reward();
            if rollout.aborted {
                summary.aborted_episodes += 1;
            }

            if rollout.trajectory.is_empty() {
                warn!("episode {} produced no usable step, skipping update", episode);
                summary.skipped_updates += 1;
            } else {
                let bootstrap = baseline_net.estimate(rollout.final_obs.view())?;
                let entropy_coef = scheduler.coefficient(episode, train_episodes);
                (actor_net, baseline_net, _) = PPO::<B, AM, BM>::train(
                    actor_net,
                    baseline_net,
                    &rollout.trajectory,
                    bootstrap,
                    entropy_coef,
                    &mut actor_optimizer,
                    &mut baseline_optimizer,
                    &ppo_config,
                    &self.device,
                    logger,
                )?;
            }

            info!(
                "episode {} reward {:.3} steps {}",
                episode + 1,
                episode_reward,
                rollout.trajectory.len()
            );
            logger.add_scalar(("train", "episode_reward"), episode_reward);
            logger.add_scalar(
                ("train", "actor_std"),
                actor_net.std_mean().into_scalar().elem::<f32>(),
            );

            summary.episode_rewards.push(episode_reward);
            recent_rewards.push_back(episode_reward);
            if recent_rewards.len() > reward_window {
                recent_rewards.pop_front();
            }
            if reward_window > 0 && (episode + 1) % reward_window == 0 {
                let avg = recent_rewards.iter().sum::<f32>() / recent_rewards.len() as f32;
                info!("episode {}: avg_reward/{} = {:.2}", episode + 1, reward_window, avg);
                logger.add_scalar(("train", "avg_reward"), avg);
                summary.rolling_averages.push((episode + 1, avg));
            }
            logger.log(episode);
        }

        summary.policy_path = self.save_policy(&actor_net)?;
        Ok((actor_net, baseline_net, summary))
    }

    fn save_policy<AM: ActorModel<B>>(&self, actor_net: &AM) -> TrainResult<PathBuf> {
        let path = self.exp_base_path.join("actor_net");
        let file_recorder = DefaultFileRecorder::<FullPrecisionSettings>::new();
        actor_net
            .clone()
            .save_file(path.clone(), &file_recorder)
            .map_err(|e| TrainError::Persist(format!("{:?}", e)))?;
        info!("policy saved to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl_algorithm::ppo::config::PPOTrainingConfig;
    use crate::rl_algorithm::preload_net::mlp_critic::MLPCriticConfig;
    use crate::rl_algorithm::preload_net::normal_mlp_policy::NormalMLPPolicyConfig;
    use crate::rl_env::config::EnvConfig;
    use crate::rl_env::env_sampler::tests::CountingEnv;
    use crate::rl_env::goal_nav::GoalNavEnv;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use burn::backend::Autodiff;

    type TestBackend = Autodiff<NdArray>;

    fn scratch_dir(tag: &str) -> String {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir()
            .join(format!("robot_ppo_{}_{}_{}", tag, std::process::id(), nanos))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_goal_nav_end_to_end() {
        let ckpt = scratch_dir("e2e");
        let config = TrainConfig::default()
            .with_train_episodes(4)
            .with_reward_window(2)
            .with_ckpt_save_path(ckpt.clone())
            .with_env_config(EnvConfig::new().with_max_episode_steps(12));
        let device = NdArrayDevice::default();
        let mut runner =
            OnPolicyRunner::<GoalNavEnv, TestBackend>::new(device, config, "ppo").unwrap();
        let obs_dim = runner.env().get_obs_dim();
        let action_dim = runner.env().get_action_dim();
        let actor = NormalMLPPolicyConfig::new(action_dim, obs_dim, 1, 16).init(&device);
        let critic = MLPCriticConfig::new(obs_dim, 1, 16).init(&device);

        let mut logger = EpochLogger::new().with_history();
        let (_, _, summary) = runner.train_update(actor, critic, &mut logger).unwrap();

        assert_eq!(summary.episode_rewards.len(), 4);
        assert!(summary.episode_rewards.iter().all(|r| r.is_finite()));
        assert_eq!(summary.rolling_averages.len(), 2);
        let (n, avg) = summary.rolling_averages[1];
        assert_eq!(n, 4);
        let expected = (summary.episode_rewards[2] + summary.episode_rewards[3]) / 2.0;
        assert!((avg - expected).abs() < 1e-5);
        assert_eq!(summary.skipped_updates, 0);

        assert!(runner.exp_base_path().join("config.json").exists());
        let saved = std::fs::read_dir(runner.exp_base_path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().starts_with("actor_net"));
        assert!(saved);
        assert!(logger
            .history()
            .iter()
            .any(|(step, tag, _)| *step == 3 && tag == "train/critic_loss"));

        std::fs::remove_dir_all(&ckpt).ok();
    }

    #[test]
    fn test_empty_rollouts_skip_updates() {
        let ckpt = scratch_dir("skip");
        let config = TrainConfig::default()
            .with_train_episodes(3)
            .with_reward_window(3)
            .with_ckpt_save_path(ckpt.clone())
            .with_ppo_train_config(
                PPOTrainingConfig::new().with_gae_boundary(GaeBoundary::Canonical),
            );
        let device = NdArrayDevice::default();
        let env = CountingEnv::with(10, Some(1));
        let mut runner =
            OnPolicyRunner::<CountingEnv, TestBackend>::with_env(device, env, config, "ppo")
                .unwrap();
        let actor = NormalMLPPolicyConfig::new(1, 2, 1, 8).init(&device);
        let critic = MLPCriticConfig::new(2, 1, 8).init(&device);

        let mut logger = EpochLogger::new();
        let (_, _, summary) = runner.train_update(actor, critic, &mut logger).unwrap();
        assert_eq!(summary.skipped_updates, 3);
        assert_eq!(summary.aborted_episodes, 3);
        assert_eq!(summary.episode_rewards, vec![0.0; 3]);
        assert_eq!(summary.rolling_averages, vec![(3, 0.0)]);

        std::fs::remove_dir_all(&ckpt).ok();
    }

    #[test]
    fn test_saved_config_round_trips() {
        let ckpt = scratch_dir("cfg");
        let config = TrainConfig::default()
            .with_train_episodes(7)
            .with_ckpt_save_path(ckpt.clone());
        let runner = OnPolicyRunner::<CountingEnv, TestBackend>::with_env(
            NdArrayDevice::default(),
            CountingEnv::with(2, None),
            config,
            "ppo",
        )
        .unwrap();
        let loaded = TrainConfig::load(runner.exp_base_path().join("config.json")).unwrap();
        assert_eq!(loaded.train_episodes, 7);
        assert_eq!(loaded.ppo_train_config.gae_boundary, GaeBoundary::SuccessorDone);

        std::fs::remove_dir_all(&ckpt).ok();
    }
}
