use std::collections::BTreeMap;

use log::info;
use tensorboard_rs::summary_writer::SummaryWriter;

pub mod config;
pub mod memory;
pub mod model;
pub mod on_policy_runner;
pub mod rl_utils;

pub enum EpochLoggerAggMode {
    Sum,
    Mean,
    Max,
    Min,
    Replace,
}

/// Collects scalars for one training step and flushes them together.
///
/// Owned by the caller and handed by reference to every component that
/// reports metrics; there is no global instance.
#[derive(Default)]
pub struct EpochLogger {
    log_info: BTreeMap<(String, String), f32>,
    counts: BTreeMap<(String, String), usize>,
    writer: Option<SummaryWriter>,
    history: Vec<(usize, String, f32)>,
    keep_history: bool,
}

impl EpochLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also writes every flushed scalar to a tensorboard event file.
    pub fn with_writer(logdir: &str) -> Self {
        Self {
            writer: Some(SummaryWriter::new(logdir)),
            ..Self::default()
        }
    }

    /// Remembers every flushed scalar so callers can inspect it afterwards.
    pub fn with_history(mut self) -> Self {
        self.keep_history = true;
        self
    }

    pub fn add_scalar(&mut self, main_tag_sub_tag: (&str, &str), val: f32) {
        let key = (
            main_tag_sub_tag.0.to_string(),
            main_tag_sub_tag.1.to_string(),
        );
        self.counts.insert(key.clone(), 1);
        self.log_info.insert(key, val);
    }

    pub fn add_scalar_agg(
        &mut self,
        main_tag_sub_tag: (&str, &str),
        mut val: f32,
        agg_mode: EpochLoggerAggMode,
    ) {
        let key = (
            main_tag_sub_tag.0.to_string(),
            main_tag_sub_tag.1.to_string(),
        );
        let count = self.counts.get(&key).copied().unwrap_or(0);
        if let Some(old_val) = self.log_info.get(&key) {
            val = match agg_mode {
                EpochLoggerAggMode::Sum => val + old_val,
                EpochLoggerAggMode::Mean => old_val + (val - old_val) / (count + 1) as f32,
                EpochLoggerAggMode::Max => val.max(*old_val),
                EpochLoggerAggMode::Min => val.min(*old_val),
                EpochLoggerAggMode::Replace => val,
            }
        }
        self.counts.insert(key.clone(), count + 1);
        self.log_info.insert(key, val);
    }

    pub fn get(&self, main_tag_sub_tag: (&str, &str)) -> Option<f32> {
        self.log_info
            .get(&(
                main_tag_sub_tag.0.to_string(),
                main_tag_sub_tag.1.to_string(),
            ))
            .copied()
    }

    pub fn history(&self) -> &[(usize, String, f32)] {
        &self.history
    }

    /// Emits all pending scalars for `step` and clears them.
    pub fn log(&mut self, step: usize) {
        let log_info = std::mem::take(&mut self.log_info);
        self.counts.clear();
        for ((main_tag, sub_tag), scalar) in log_info {
            let tag = format!("{}/{}", main_tag, sub_tag);
            info!("step={} {}={}", step, tag, scalar);
            if let Some(writer) = self.writer.as_mut() {
                writer.add_scalar(&tag, scalar, step);
            }
            if self.keep_history {
                self.history.push((step, tag, scalar));
            }
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.flush();
        }
    }
}
