pub mod avoid_overflow;
pub mod distribution;
pub mod rand;
pub mod sequence;
pub use self::avoid_overflow::*;
pub use self::rand::*;
pub use self::sequence::*;
