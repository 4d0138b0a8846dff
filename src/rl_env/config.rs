use burn::config::Config;

#[derive(Config, Debug)]
pub struct EnvConfig {
    /// Environment-side truncation. The environment reports `done` once this
    /// many steps have been taken; the collector itself never truncates.
    #[config(default = 400)]
    pub max_episode_steps: usize,
    #[config(default = 0)]
    pub seed: u64,
    /// Side length of the square occupancy grid, in cells.
    #[config(default = 40)]
    pub map_size: usize,
    /// World units per grid cell.
    #[config(default = 0.05)]
    pub resolution: f32,
    #[config(default = 0.25)]
    pub goal_tolerance: f32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}
