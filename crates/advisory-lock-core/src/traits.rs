//! Driver traits that lock handles are built on.
//!
//! The database is the lock manager. These traits describe the small surface a
//! pool and its connections must offer for a client to pin one session to a
//! named advisory lock: acquire the lock, release it, probe the session and
//! close it.

use std::future::Future;

use crate::error::BoxError;
use crate::timeout::WaitTimeout;

// ============================================================================
// Session Connection Trait
// ============================================================================

/// A single database session checked out of a pool.
///
/// Advisory locks belong to the session that took them, so one value of this
/// type is the physical carrier of a held lock.
///
/// Dropping the connection hands it back to its pool with the session (and
/// any lock it still holds) intact. Call [`close`](Self::close) to end the
/// session instead.
pub trait SessionConnection: Send + 'static {
    /// Requests the named lock, waiting server-side according to `wait`.
    ///
    /// Returns the raw status reported by the server: `1` acquired, `0` timed
    /// out, anything else a server-side failure.
    fn get_lock(
        &mut self,
        name: &str,
        wait: WaitTimeout,
    ) -> impl Future<Output = Result<i64, BoxError>> + Send;

    /// Releases the named lock if this session holds it.
    fn release_lock(&mut self, name: &str) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Checks that the session is still alive.
    ///
    /// Implementations do not bound this call; callers wrap it in a deadline.
    fn ping(&mut self) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Closes the session for good. The server drops every lock the session
    /// still holds.
    fn close(self) -> impl Future<Output = Result<(), BoxError>> + Send;
}

// ============================================================================
// Connection Source Trait
// ============================================================================

/// A pool of sessions.
///
/// # Example
///
/// ```rust,ignore
/// let source = MySqlConnectionSource::new(pool);
/// let mut conn = source.acquire_connection().await?;
/// let status = conn.get_lock("jobs", WaitTimeout::ZERO).await?;
/// ```
pub trait ConnectionSource: Send + Sync + 'static {
    /// The session type handed out by this source.
    type Connection: SessionConnection;

    /// Checks out one exclusive session.
    fn acquire_connection(&self) -> impl Future<Output = Result<Self::Connection, BoxError>> + Send;
}
