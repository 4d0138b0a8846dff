pub mod config;
pub mod env;
pub mod env_sampler;
pub mod goal_nav;
pub mod value_map;
