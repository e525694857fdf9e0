//! Error types for advisory lock operations.

use thiserror::Error;

use crate::timeout::WaitTimeout;

/// Boxed driver error carried as the source of connection and transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during lock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// The connection source could not hand out a connection before the
    /// caller gave up.
    #[error("failed to get a db connection: {0}")]
    ConnectionUnavailable(#[source] BoxError),

    /// The caller's context was cancelled while the acquire call was in flight.
    #[error("context cancelled while trying to obtain lock")]
    AcquireCancelled,

    /// The server gave up waiting for the lock.
    #[error("timed out after {0} waiting for the lock")]
    LockTimeout(WaitTimeout),

    /// The server failed for a reason unrelated to contention
    /// (out of memory, thread killed, ...).
    #[error("internal server error acquiring the lock")]
    LockServerError,

    /// The acquire response could not be read.
    #[error("could not read server response: {0}")]
    AcquireTransport(#[source] BoxError),

    /// `release` was called on a handle that was already released.
    #[error("lock already released")]
    AlreadyReleased,

    /// Invalid lock name.
    #[error("invalid lock name: {0}")]
    InvalidName(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Closing the lock's connection failed during release.
    #[error("failed to close lock connection: {0}")]
    Close(#[source] BoxError),

    /// The background refresh task did not finish cleanly.
    #[error("refresh task failed: {0}")]
    RefreshTask(#[source] tokio::task::JoinError),
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Cause attached to [`LockError::ConnectionUnavailable`] when the caller's
/// context was cancelled before the pool produced a connection.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("caller context cancelled")]
pub struct ContextCancelled;
