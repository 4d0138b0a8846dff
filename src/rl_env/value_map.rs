//! Hand-built value landscape over an occupancy grid.
//!
//! Cells close to the reference path and to the goal score high, cells close
//! to obstacles score low. Every component and the final blend are min-max
//! normalized into `[0, 1]`; a `1e-8` term keeps flat maps finite.

use ndarray::{Array2, ArrayView2, Axis, Zip};

use crate::error::EnvError;

const FAR: f64 = 1e20;
const NORM_EPS: f32 = 1e-8;

#[derive(Debug, Clone, Copy)]
pub struct ValueMapWeights {
    pub path_weight: f32,
    pub obstacle_weight: f32,
    pub goal_weight: f32,
    /// Decay length of obstacle repulsion, in cells.
    pub repulsion_scale: f32,
}

impl Default for ValueMapWeights {
    fn default() -> Self {
        Self {
            path_weight: 5.0,
            obstacle_weight: 1.0,
            goal_weight: 4.0,
            repulsion_scale: 1.5,
        }
    }
}

// Felzenszwalb & Huttenlocher lower envelope of parabolas.
fn squared_distance_1d(f: &[f64]) -> Vec<f64> {
    let n = f.len();
    let mut d = vec![0.0; n];
    if n == 0 {
        return d;
    }
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];
    let mut k = 0usize;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;
    for q in 1..n {
        let qf = q as f64;
        let mut s;
        loop {
            let vk = v[k] as f64;
            s = ((f[q] + qf * qf) - (f[v[k]] + vk * vk)) / (2.0 * qf - 2.0 * vk);
            if s <= z[k] && k > 0 {
                k -= 1;
            } else {
                break;
            }
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }
    k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        let qf = q as f64;
        while z[k + 1] < qf {
            k += 1;
        }
        let vk = v[k] as f64;
        *out = (qf - vk) * (qf - vk) + f[v[k]];
    }
    d
}

/// Euclidean distance (in cells) from every cell to the nearest `true` cell.
/// With no `true` cell at all, every cell gets the grid diagonal.
pub fn distance_to_nearest(targets: ArrayView2<bool>) -> Array2<f32> {
    let (h, w) = targets.dim();
    if !targets.iter().any(|t| *t) {
        let diag = ((h * h + w * w) as f32).sqrt();
        return Array2::from_elem((h, w), diag);
    }
    let mut sq = targets.mapv(|t| if t { 0.0 } else { FAR });
    for mut col in sq.axis_iter_mut(Axis(1)) {
        let out = squared_distance_1d(&col.to_vec());
        col.iter_mut().zip(out).for_each(|(c, o)| *c = o);
    }
    for mut row in sq.axis_iter_mut(Axis(0)) {
        let out = squared_distance_1d(&row.to_vec());
        row.iter_mut().zip(out).for_each(|(c, o)| *c = o);
    }
    sq.mapv(|d| d.sqrt() as f32)
}

pub fn min_max_normalize(values: &Array2<f32>) -> Array2<f32> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    values.mapv(|v| (v - min) / (max - min + NORM_EPS))
}

fn mask_from_cells(
    shape: (usize, usize),
    cells: &[(usize, usize)],
) -> Result<Array2<bool>, EnvError> {
    let mut mask = Array2::from_elem(shape, false);
    for &(x, y) in cells {
        match mask.get_mut((y, x)) {
            Some(cell) => *cell = true,
            None => {
                return Err(EnvError::Fault(format!(
                    "cell ({}, {}) outside {}x{} grid",
                    x, y, shape.1, shape.0
                )))
            }
        }
    }
    Ok(mask)
}

/// Builds the value map for `grid` (`1` = obstacle), a reference path and a
/// goal cell. Cells are `(x, y)`, i.e. `(column, row)`.
pub fn precompute_value_map(
    grid: ArrayView2<u8>,
    optimal_path: &[(usize, usize)],
    goal: (usize, usize),
    weights: ValueMapWeights,
) -> Result<Array2<f32>, EnvError> {
    let shape = grid.dim();

    // distance from each cell to the nearest obstacle, so repulsion peaks on obstacles
    let obstacle_distances = distance_to_nearest(grid.mapv(|c| c == 1).view());
    let repulsion = obstacle_distances.mapv(|d| (-d / weights.repulsion_scale).exp());
    let repulsion = min_max_normalize(&repulsion);

    let path_distances = distance_to_nearest(mask_from_cells(shape, optimal_path)?.view());
    let max_path = path_distances.iter().copied().fold(0.0, f32::max);
    let path_values = min_max_normalize(&path_distances.mapv(|d| max_path - d));

    let goal_distances = distance_to_nearest(mask_from_cells(shape, &[goal])?.view());
    let max_goal = goal_distances.iter().copied().fold(0.0, f32::max);
    let goal_values = min_max_normalize(&goal_distances.mapv(|d| max_goal - d));

    let mut value_map = Array2::<f32>::zeros(shape);
    Zip::from(&mut value_map)
        .and(&path_values)
        .and(&goal_values)
        .and(&repulsion)
        .for_each(|v, p, g, r| {
            *v = weights.path_weight * p + weights.goal_weight * g - weights.obstacle_weight * r
        });
    Ok(min_max_normalize(&value_map))
}

/// Grid cell `(x, y)` containing a world point, clamped to the grid.
pub fn world_to_map(
    point: (f32, f32),
    resolution: f32,
    origin: (f32, f32),
    map_shape: (usize, usize),
) -> (usize, usize) {
    let to_cell = |p: f32, o: f32, n: usize| {
        let c = ((p - o) / resolution).floor();
        if c.is_nan() || c < 0.0 {
            0
        } else {
            (c as usize).min(n.saturating_sub(1))
        }
    };
    (
        to_cell(point.0, origin.0, map_shape.1),
        to_cell(point.1, origin.1, map_shape.0),
    )
}

/// Fixed critic that reads values off a precomputed map.
#[derive(Debug, Clone)]
pub struct StaticCritic {
    value_map: Array2<f32>,
    resolution: f32,
    origin: (f32, f32),
}

impl StaticCritic {
    pub fn new(value_map: Array2<f32>, resolution: f32, origin: (f32, f32)) -> Self {
        Self {
            value_map,
            resolution,
            origin,
        }
    }

    pub fn value_at(&self, x: f32, y: f32) -> f32 {
        let (cx, cy) = world_to_map((x, y), self.resolution, self.origin, self.value_map.dim());
        self.value_map[(cy, cx)]
    }

    pub fn value_map(&self) -> &Array2<f32> {
        &self.value_map
    }
}
