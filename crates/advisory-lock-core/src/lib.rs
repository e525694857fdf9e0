//! Core traits and types for session-pinned advisory locks.

pub mod error;
pub mod prelude;
pub mod timeout;
pub mod traits;

pub use error::{BoxError, ContextCancelled, LockError, LockResult};
pub use prelude::*;
