pub mod error;
pub mod triage;

pub use error::AppError;
pub use triage::*;
