mod sequence;

pub mod nanos;
pub use sequence::*;
