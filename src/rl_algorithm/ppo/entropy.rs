use super::config::PPOTrainingConfig;

/// Linear annealing of the entropy bonus from `max_entropy` at episode 0 down
/// to `min_entropy` at the final episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntropyScheduler {
    min_entropy: f32,
    max_entropy: f32,
}

impl EntropyScheduler {
    pub fn new(min_entropy: f32, max_entropy: f32) -> Self {
        debug_assert!(
            min_entropy <= max_entropy,
            "EntropyScheduler: min_entropy {} > max_entropy {}",
            min_entropy,
            max_entropy
        );
        Self {
            min_entropy,
            max_entropy,
        }
    }

    pub fn from_config(config: &PPOTrainingConfig) -> Self {
        Self::new(config.min_entropy, config.max_entropy)
    }

    pub fn coefficient(&self, episode: usize, max_episodes: usize) -> f32 {
        if max_episodes == 0 {
            return self.max_entropy;
        }
        if episode >= max_episodes {
            return self.min_entropy;
        }
        let progress = episode as f64 / max_episodes as f64;
        let span = self.max_entropy as f64 - self.min_entropy as f64;
        let coef = self.max_entropy as f64 - span * progress;
        (coef as f32).clamp(self.min_entropy, self.max_entropy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let sched = EntropyScheduler::new(1e-4, 1e-2);
        assert_eq!(sched.coefficient(0, 500), 1e-2);
        assert_eq!(sched.coefficient(500, 500), 1e-4);
    }

    #[test]
    fn test_endpoints_are_exact_for_any_bounds() {
        let bounds = [
            (1e-4f32, 1e-2f32),
            (0.1, 0.9),
            (0.013, 0.5),
            (1e-5, 3.3),
            (0.0, 0.7),
            (0.25, 0.25),
        ];
        for (lo, hi) in bounds {
            let sched = EntropyScheduler::new(lo, hi);
            for m in [1usize, 2, 3, 7, 100, 999] {
                assert_eq!(sched.coefficient(0, m), hi, "({}, {}) m={}", lo, hi, m);
                assert_eq!(sched.coefficient(m, m), lo, "({}, {}) m={}", lo, hi, m);
                let last = sched.coefficient(m - 1, m);
                assert!((lo..=hi).contains(&last));
            }
        }
    }

    #[test]
    fn test_non_increasing_and_bounded() {
        let sched = EntropyScheduler::new(1e-4, 1e-2);
        let max_episodes = 137;
        let mut prev = f32::INFINITY;
        for episode in 0..=max_episodes {
            let coef = sched.coefficient(episode, max_episodes);
            assert!(coef <= prev);
            assert!((1e-4..=1e-2).contains(&coef));
            prev = coef;
        }
    }

    #[test]
    fn test_midpoint_and_overrun() {
        let sched = EntropyScheduler::new(0.0, 1.0);
        assert!((sched.coefficient(50, 100) - 0.5).abs() < 1e-6);
        assert_eq!(sched.coefficient(1_000, 100), 0.0);
    }

    #[test]
    fn test_zero_episodes_keeps_max() {
        let sched = EntropyScheduler::from_config(&PPOTrainingConfig::new());
        assert_eq!(sched.coefficient(0, 0), 1e-2);
    }
}
