use burn::tensor::backend::AutodiffBackend;
use log::{trace, warn};
use ndarray::Array1;
use rand::rngs::StdRng;

use super::env::RobotEnv;
use crate::burn_utils::rand::seeded_rng;
use crate::error::TrainResult;
use crate::rl_algorithm::base::memory::{Trajectory, Transition};
use crate::rl_algorithm::base::model::{ActorModel, BaselineModel};
use crate::rl_algorithm::base::{EpochLogger, EpochLoggerAggMode};

/// One collected episode.
#[derive(Debug)]
pub struct Rollout {
    pub trajectory: Trajectory,
    /// State reached after the last recorded step; the bootstrap value is
    /// estimated here.
    pub final_obs: Array1<f32>,
    /// The environment produced a non-finite observation and the episode was
    /// cut short. The truncated trajectory is still trained on.
    pub aborted: bool,
}

/// Drives a single environment through one episode with the current policy.
pub struct RolloutCollector {
    rng: StdRng,
}

impl RolloutCollector {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: seeded_rng(seed),
        }
    }

    pub fn collect<E, B, AM, BM>(
        &mut self,
        env: &mut E,
        initial_obs: Array1<f32>,
        actor: &AM,
        critic: &BM,
        logger: &mut EpochLogger,
    ) -> TrainResult<Rollout>
    where
        E: RobotEnv + ?Sized,
        B: AutodiffBackend,
        AM: ActorModel<B>,
        BM: BaselineModel<B>,
    {
        let mut state = initial_obs;
        let mut transitions = Vec::<Transition>::new();
        let mut aborted = false;
        loop {
            let sample = actor.sample(state.view(), &mut self.rng)?;
            trace!(
                "action={} log_prob={} entropy={} std={}",
                sample.action,
                sample.log_prob,
                sample.entropy,
                sample.std
            );
            logger.add_scalar_agg(
                ("rollout", "policy_std"),
                sample.std.mean().unwrap_or(0.0),
                EpochLoggerAggMode::Mean,
            );

            let step_info = env.step(sample.action.view())?;
            if step_info.next_obs.iter().any(|x| !x.is_finite()) {
                warn!(
                    "non-finite observation after {} steps, ending episode early",
                    transitions.len()
                );
                aborted = true;
                break;
            }

            let value = critic.estimate(state.view())?;
            trace!("value={}", value.0);
            let done = step_info.done;
            transitions.push(Transition::new(state, sample, step_info.reward, done, value));
            state = step_info.next_obs;
            if done {
                break;
            }
        }

        let trajectory = Trajectory::new(transitions)?;
        logger.add_scalar(("rollout", "length"), trajectory.len() as f32);
        logger.add_scalar(("rollout", "aborted"), if aborted { 1.0 } else { 0.0 });
        Ok(Rollout {
            trajectory,
            final_obs: state,
            aborted,
        })
    }
}
