use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use burn::config::Config;
use clap::Parser;
use log::{error, info};

use robot_ppo::ppo_run::train_network;
use robot_ppo::rl_algorithm::base::config::TrainConfig;
use robot_ppo::rl_env::goal_nav::GoalNavEnv;

/// Train a PPO policy on the goal-navigation robot.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON training config; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the number of training episodes.
    #[arg(long)]
    episodes: Option<usize>,
    /// Directory for tensorboard summaries.
    #[arg(long)]
    log_dir: Option<String>,
}

fn load_config(args: &Args) -> Result<TrainConfig> {
    let mut config = match &args.config {
        Some(path) => TrainConfig::load(path)
            .map_err(|e| anyhow::anyhow!("{e:?}"))
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrainConfig::default(),
    };
    if let Some(episodes) = args.episodes {
        config.train_episodes = episodes;
    }
    if args.log_dir.is_some() {
        config.log_dir = args.log_dir.clone();
    }
    Ok(config)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::from(1);
        }
    };

    match train_network::<GoalNavEnv>(config) {
        Ok(summary) => {
            info!(
                "finished {} episodes, policy at {}",
                summary.episode_rewards.len(),
                summary.policy_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) if e.is_numeric_failure() => {
            error!("training halted: numeric instability ({e})");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("training failed: {e}");
            ExitCode::from(1)
        }
    }
}
