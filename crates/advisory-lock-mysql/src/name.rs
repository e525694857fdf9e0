//! MySQL lock name validation.
//!
//! Names are passed to `GET_LOCK` exactly as given. MySQL itself rejects names
//! longer than 64 characters; that failure surfaces as a transport error from
//! the acquire call, so only emptiness is checked on the client.

use advisory_lock_core::error::{LockError, LockResult};

/// Checks that `name` can be used as a lock key.
pub fn validate_lock_name(name: &str) -> LockResult<()> {
    if name.is_empty() {
        return Err(LockError::InvalidName("lock name must not be empty".to_string()));
    }
    Ok(())
}
