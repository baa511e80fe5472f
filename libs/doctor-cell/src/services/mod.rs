pub mod matching;
pub mod roster;

pub use matching::*;
pub use roster::*;
