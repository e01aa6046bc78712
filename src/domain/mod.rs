//! Domain layer - Pure business abstractions
//!
//! Only trait definitions and the normalized error types. Implementations
//! live in the infrastructure layer.

pub mod errors;
pub mod repositories;

pub use errors::{OperationError, OperationResult, UnexpectedError};
pub use repositories::*;
