pub mod normal;

pub use normal::SquashedNormal;
