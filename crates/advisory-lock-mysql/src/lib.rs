//! MySQL backend for session-pinned advisory locks.
//!
//! Uses MySQL's GET_LOCK and RELEASE_LOCK functions. Each held lock keeps one
//! pooled session checked out, pings it in the background and exposes lock
//! loss through a cancellation token.

pub mod client;
pub mod connection;
pub mod handle;
pub mod name;
pub mod options;
pub mod provider;

pub use client::{GetLockStatus, LockerClient};
pub use connection::{MySqlConnectionSource, MySqlSession};
pub use handle::LockHandle;
pub use options::{DEFAULT_REFRESH_INTERVAL, LockerOptions};
pub use provider::{MySqlLockHandle, MySqlLocker, MySqlLockerBuilder};
