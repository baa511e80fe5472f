pub mod lifecycle;
pub mod manager;
pub mod query;
pub mod store;

pub use lifecycle::*;
pub use manager::*;
pub use query::*;
pub use store::*;
