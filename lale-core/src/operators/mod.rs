//! Native operators with no external collaborator.

pub mod keep_numbers;
pub mod map;

pub use keep_numbers::{KeepNumbers, TrainedKeepNumbers};
pub use map::{Map, MapRemainder};
