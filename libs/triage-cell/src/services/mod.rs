pub mod classifier;
pub mod keywords;
pub mod remote;

pub use classifier::*;
pub use keywords::*;
pub use remote::*;
