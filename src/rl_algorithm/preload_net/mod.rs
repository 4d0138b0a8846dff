pub mod mlp_critic;
pub mod normal_mlp_policy;
