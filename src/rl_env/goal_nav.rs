// differential-drive robot that has to reach a goal on a small occupancy grid,
// shaped with the static value map

use std::collections::BTreeMap;
use std::f32::consts::FRAC_PI_4;

use log::debug;
use ndarray::{array, Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::Rng;

use super::config::EnvConfig;
use super::env::{RobotEnv, StepInfo};
use super::value_map::{precompute_value_map, world_to_map, StaticCritic, ValueMapWeights};
use crate::burn_utils::rand::seeded_rng;
use crate::error::EnvError;

const OBS_DIM: usize = 6;
const ACTION_DIM: usize = 2;
const MAX_LINEAR_STEP: f32 = 0.1;
const MAX_ANGULAR_STEP: f32 = 0.5;
const GOAL: (f32, f32) = (1.7, 1.0);
const OBSTACLE: ((f32, f32), (f32, f32)) = ((0.9, 1.1), (0.2, 0.7));
const START_X: (f32, f32) = (0.2, 0.4);
const START_Y: (f32, f32) = (0.8, 1.2);

const PROGRESS_GAIN: f32 = 10.0;
const SHAPING_GAIN: f32 = 2.0;
const STEP_COST: f32 = 0.01;
const GOAL_BONUS: f32 = 10.0;
const COLLISION_PENALTY: f32 = 5.0;

#[derive(Debug, Clone, Copy)]
struct Pose {
    x: f32,
    y: f32,
    theta: f32,
}

pub struct GoalNavEnv {
    env_conf: EnvConfig,
    grid: Array2<u8>,
    critic: StaticCritic,
    rng: StdRng,
    pose: Pose,
    steps: usize,
}

// Cells on the straight line between two cells (Bresenham).
fn line_cells(from: (usize, usize), to: (usize, usize)) -> Vec<(usize, usize)> {
    let (mut x, mut y) = (from.0 as i64, from.1 as i64);
    let (tx, ty) = (to.0 as i64, to.1 as i64);
    let dx = (tx - x).abs();
    let dy = -(ty - y).abs();
    let sx = if x < tx { 1 } else { -1 };
    let sy = if y < ty { 1 } else { -1 };
    let mut err = dx + dy;
    let mut cells = Vec::new();
    loop {
        cells.push((x as usize, y as usize));
        if x == tx && y == ty {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}

fn build_grid(env_conf: &EnvConfig) -> Array2<u8> {
    let n = env_conf.map_size;
    let res = env_conf.resolution;
    let ((x0, x1), (y0, y1)) = OBSTACLE;
    Array2::from_shape_fn((n, n), |(row, col)| {
        let cx = (col as f32 + 0.5) * res;
        let cy = (row as f32 + 0.5) * res;
        u8::from(cx >= x0 && cx <= x1 && cy >= y0 && cy <= y1)
    })
}

impl GoalNavEnv {
    fn world_size(&self) -> f32 {
        self.env_conf.map_size as f32 * self.env_conf.resolution
    }

    fn to_cell(&self, x: f32, y: f32) -> (usize, usize) {
        world_to_map((x, y), self.env_conf.resolution, (0.0, 0.0), self.grid.dim())
    }

    fn distance_to_goal(&self) -> f32 {
        (GOAL.0 - self.pose.x).hypot(GOAL.1 - self.pose.y)
    }

    fn collided(&self) -> bool {
        let size = self.world_size();
        let Pose { x, y, .. } = self.pose;
        if !(0.0..size).contains(&x) || !(0.0..size).contains(&y) {
            return true;
        }
        let (cx, cy) = self.to_cell(x, y);
        self.grid[(cy, cx)] == 1
    }

    fn get_obs(&self) -> Array1<f32> {
        let Pose { x, y, theta } = self.pose;
        array![x, y, theta.cos(), theta.sin(), GOAL.0 - x, GOAL.1 - y]
    }

    pub fn value_map(&self) -> &Array2<f32> {
        self.critic.value_map()
    }

    pub fn grid(&self) -> &Array2<u8> {
        &self.grid
    }
}

impl RobotEnv for GoalNavEnv {
    fn new(env_conf: EnvConfig) -> Self {
        let grid = build_grid(&env_conf);
        let shape = grid.dim();
        let res = env_conf.resolution;
        let start_cell = world_to_map(
            ((START_X.0 + START_X.1) / 2.0, (START_Y.0 + START_Y.1) / 2.0),
            res,
            (0.0, 0.0),
            shape,
        );
        let goal_cell = world_to_map(GOAL, res, (0.0, 0.0), shape);
        let path = line_cells(start_cell, goal_cell);
        // path and goal cells come from world_to_map and are always inside the grid
        let value_map =
            precompute_value_map(grid.view(), &path, goal_cell, ValueMapWeights::default())
                .unwrap_or_else(|_| Array2::zeros(shape));
        let rng = seeded_rng(env_conf.seed);
        Self {
            critic: StaticCritic::new(value_map, res, (0.0, 0.0)),
            grid,
            rng,
            pose: Pose {
                x: START_X.0,
                y: START_Y.0,
                theta: 0.0,
            },
            steps: 0,
            env_conf,
        }
    }

    fn reset(&mut self) -> Result<Array1<f32>, EnvError> {
        self.pose = Pose {
            x: self.rng.random_range(START_X.0..START_X.1),
            y: self.rng.random_range(START_Y.0..START_Y.1),
            theta: self.rng.random_range(-FRAC_PI_4..FRAC_PI_4),
        };
        self.steps = 0;
        debug!(
            "reset pose x={:.3} y={:.3} theta={:.3}",
            self.pose.x, self.pose.y, self.pose.theta
        );
        Ok(self.get_obs())
    }

    fn step(&mut self, action: ArrayView1<f32>) -> Result<StepInfo, EnvError> {
        if action.len() != ACTION_DIM {
            return Err(EnvError::ActionDim {
                expected: ACTION_DIM,
                got: action.len(),
            });
        }
        let old_distance = self.distance_to_goal();
        let old_value = self.critic.value_at(self.pose.x, self.pose.y);

        let v = action[0].clamp(-1.0, 1.0) * MAX_LINEAR_STEP;
        let w = action[1].clamp(-1.0, 1.0) * MAX_ANGULAR_STEP;
        self.pose.theta += w;
        self.pose.x += v * self.pose.theta.cos();
        self.pose.y += v * self.pose.theta.sin();
        self.steps += 1;

        let new_distance = self.distance_to_goal();
        let new_value = self.critic.value_at(self.pose.x, self.pose.y);
        let mut reward = PROGRESS_GAIN * (old_distance - new_distance)
            + SHAPING_GAIN * (new_value - old_value)
            - STEP_COST;

        let mut info = BTreeMap::new();
        info.insert("distance_to_goal".to_string(), new_distance);
        let done = if new_distance < self.env_conf.goal_tolerance {
            reward += GOAL_BONUS;
            info.insert("reached_goal".to_string(), 1.0);
            true
        } else if self.collided() {
            reward -= COLLISION_PENALTY;
            info.insert("collision".to_string(), 1.0);
            true
        } else {
            self.steps >= self.env_conf.max_episode_steps
        };

        Ok(StepInfo {
            next_obs: self.get_obs(),
            reward,
            done,
            info,
        })
    }

    fn get_obs_dim(&self) -> usize {
        OBS_DIM
    }

    fn get_action_dim(&self) -> usize {
        ACTION_DIM
    }
}
