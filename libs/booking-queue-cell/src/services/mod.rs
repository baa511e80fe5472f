pub mod clock;
pub mod queue;
pub mod scheduler;

pub use clock::*;
pub use queue::*;
pub use scheduler::*;
