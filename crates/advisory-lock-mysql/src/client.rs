//! Locker client: acquires MySQL advisory locks on pinned sessions.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, field, instrument};

use advisory_lock_core::error::{ContextCancelled, LockError, LockResult};
use advisory_lock_core::timeout::WaitTimeout;
use advisory_lock_core::traits::{ConnectionSource, SessionConnection};

use crate::handle::LockHandle;
use crate::name::validate_lock_name;
use crate::options::LockerOptions;

/// Outcome reported by `SELECT COALESCE(GET_LOCK(?, ?), 2)`.
///
/// `GET_LOCK` folds three results into one column: `1` acquired, `0` timed
/// out, `NULL` for a server-side failure. The query maps `NULL` to `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetLockStatus {
    Acquired,
    TimedOut,
    ServerError,
}

impl GetLockStatus {
    pub fn from_status(status: i64) -> Self {
        match status {
            1 => Self::Acquired,
            0 => Self::TimedOut,
            _ => Self::ServerError,
        }
    }
}

/// Hands out [`LockHandle`]s for named locks.
///
/// The client holds no per-lock state and is cheap to clone. Each acquired
/// lock takes one session out of the source for as long as it is held.
///
/// # Example
///
/// ```rust,ignore
/// let client = LockerClient::new(source, LockerOptions::default())?;
/// let handle = client.acquire_timeout("nightly-report", WaitTimeout::from_secs(10)).await?;
/// // Critical section
/// handle.release().await?;
/// ```
pub struct LockerClient<S: ConnectionSource> {
    source: Arc<S>,
    refresh_interval: Duration,
}

impl<S: ConnectionSource> LockerClient<S> {
    /// Creates a client over `source`.
    pub fn new(source: S, options: LockerOptions) -> LockResult<Self> {
        if options.refresh_interval.is_zero() {
            return Err(LockError::InvalidConfig(
                "refresh interval must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            source: Arc::new(source),
            refresh_interval: options.refresh_interval,
        })
    }

    /// Creates a client with the default one second refresh interval.
    pub fn with_defaults(source: S) -> Self {
        Self {
            source: Arc::new(source),
            refresh_interval: LockerOptions::default().refresh_interval,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Acquires the lock, waiting for it indefinitely.
    pub async fn acquire(&self, key: &str) -> LockResult<LockHandle<S::Connection>> {
        self.acquire_timeout_context(&CancellationToken::new(), key, WaitTimeout::INFINITE)
            .await
    }

    /// Acquires the lock, letting the server wait up to `wait`.
    pub async fn acquire_timeout(
        &self,
        key: &str,
        wait: WaitTimeout,
    ) -> LockResult<LockHandle<S::Connection>> {
        self.acquire_timeout_context(&CancellationToken::new(), key, wait)
            .await
    }

    /// Acquires the lock, waiting until it is free or `ctx` is cancelled.
    pub async fn acquire_context(
        &self,
        ctx: &CancellationToken,
        key: &str,
    ) -> LockResult<LockHandle<S::Connection>> {
        self.acquire_timeout_context(ctx, key, WaitTimeout::INFINITE)
            .await
    }

    /// Attempts to acquire the lock without waiting.
    ///
    /// Returns `Ok(None)` if another session holds it.
    pub async fn try_acquire(&self, key: &str) -> LockResult<Option<LockHandle<S::Connection>>> {
        match self.acquire_timeout(key, WaitTimeout::ZERO).await {
            Ok(handle) => Ok(Some(handle)),
            Err(LockError::LockTimeout(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Acquires the lock on a dedicated session.
    ///
    /// `ctx` only bounds this call: once the lock is held its liveness is
    /// tracked by the returned handle alone.
    ///
    /// # Returns
    ///
    /// * `Ok(handle)` - Lock acquired
    /// * `Err(LockError::ConnectionUnavailable)` - No session before `ctx` was cancelled
    /// * `Err(LockError::AcquireCancelled)` - `ctx` was cancelled during the lock call
    /// * `Err(LockError::LockTimeout)` - The server gave up after `wait`
    /// * `Err(LockError::LockServerError)` - The server failed to take the lock
    /// * `Err(LockError::AcquireTransport)` - The response could not be read
    #[instrument(
        skip_all,
        fields(
            lock.key = %key,
            wait = %wait,
            backend = "mysql",
            acquired = field::Empty,
            elapsed_ms = field::Empty,
        )
    )]
    pub async fn acquire_timeout_context(
        &self,
        ctx: &CancellationToken,
        key: &str,
        wait: WaitTimeout,
    ) -> LockResult<LockHandle<S::Connection>> {
        validate_lock_name(key)?;
        let start = Instant::now();

        let mut connection = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                return Err(LockError::ConnectionUnavailable(Box::new(ContextCancelled)));
            }
            result = self.source.acquire_connection() => {
                result.map_err(LockError::ConnectionUnavailable)?
            }
        };

        // Drivers don't label errors caused by cancellation, so the lock call
        // is raced against the caller's token instead.
        let status = tokio::select! {
            biased;
            _ = ctx.cancelled() => None,
            result = connection.get_lock(key, wait) => Some(result),
        };

        let status = match status {
            Some(Ok(status)) => status,
            Some(Err(e)) if !ctx.is_cancelled() => {
                Span::current().record("acquired", false);
                discard(connection).await;
                return Err(LockError::AcquireTransport(e));
            }
            _ => {
                // The server may still grant the lock to this session, so it
                // is closed rather than returned to the pool.
                Span::current().record("acquired", false);
                discard(connection).await;
                return Err(LockError::AcquireCancelled);
            }
        };

        Span::current().record("elapsed_ms", start.elapsed().as_millis() as u64);

        match GetLockStatus::from_status(status) {
            GetLockStatus::Acquired => {
                Span::current().record("acquired", true);
                Ok(LockHandle::new(
                    key.to_string(),
                    connection,
                    self.refresh_interval,
                ))
            }
            GetLockStatus::TimedOut => {
                Span::current().record("acquired", false);
                Err(LockError::LockTimeout(wait))
            }
            GetLockStatus::ServerError => {
                Span::current().record("acquired", false);
                debug!("GET_LOCK reported status {}", status);
                Err(LockError::LockServerError)
            }
        }
    }
}

impl<S: ConnectionSource> Clone for LockerClient<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            refresh_interval: self.refresh_interval,
        }
    }
}

impl<S: ConnectionSource> fmt::Debug for LockerClient<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockerClient")
            .field("refresh_interval", &self.refresh_interval)
            .finish_non_exhaustive()
    }
}

/// Closes a session whose state is unknown.
async fn discard<C: SessionConnection>(connection: C) {
    if let Err(e) = connection.close().await {
        debug!("failed to close session after aborted GET_LOCK: {}", e);
    }
}
