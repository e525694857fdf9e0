//! Convenience prelude for advisory lock types.

pub use crate::error::{LockError, LockResult};
pub use crate::timeout::WaitTimeout;
pub use crate::traits::{ConnectionSource, SessionConnection};
