pub mod config;
pub mod entropy;
pub mod ppo_agent;
