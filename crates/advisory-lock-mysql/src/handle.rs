//! Lock handle implementation and its background refresh task.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use advisory_lock_core::error::{LockError, LockResult};
use advisory_lock_core::traits::SessionConnection;

/// Handle to a held MySQL advisory lock.
///
/// The handle pins the session that took the lock. A background task pings
/// that session every refresh interval; if a ping fails or overruns the
/// interval the lock is considered lost and [`liveness`](Self::liveness) is
/// cancelled. Losing a lock is final: take a new one through the client.
///
/// Call [`release`](Self::release) to give the lock up. Dropping an
/// unreleased handle tears the session down on a spawned task.
///
/// # Example
///
/// ```rust,ignore
/// let handle = client.acquire("reports").await?;
/// let lost = handle.liveness();
/// tokio::select! {
///     _ = lost.cancelled() => eprintln!("lock was lost"),
///     _ = do_work() => {}
/// }
/// handle.release().await?;
/// ```
pub struct LockHandle<C: SessionConnection> {
    /// Lock name as passed to GET_LOCK.
    key: String,
    /// Cancelled once the lock is released or lost.
    liveness: CancellationToken,
    /// Tells the refresh task to stop.
    release_requested: CancellationToken,
    /// Set by the first release (or drop).
    released: AtomicBool,
    /// Refresh task. It owns the session while the lock is held and hands it
    /// back when it finishes.
    refresher: Mutex<Option<JoinHandle<Option<C>>>>,
    /// Runtime the refresh task runs on; teardown after drop is spawned here.
    runtime: Handle,
}

impl<C: SessionConnection> LockHandle<C> {
    /// Takes ownership of a session that holds `key` and starts refreshing it.
    pub(crate) fn new(key: String, connection: C, refresh_interval: Duration) -> Self {
        let liveness = CancellationToken::new();
        let release_requested = CancellationToken::new();
        let runtime = Handle::current();

        let refresher = runtime.spawn(refresh(
            SessionGuard::new(connection, liveness.clone(), runtime.clone()),
            key.clone(),
            refresh_interval,
            release_requested.clone(),
        ));

        Self {
            key,
            liveness,
            release_requested,
            released: AtomicBool::new(false),
            refresher: Mutex::new(Some(refresher)),
            runtime,
        }
    }

    /// Returns the lock name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns a token that is cancelled when the lock is released or lost.
    ///
    /// Every call returns a clone sharing the same cancellation state.
    pub fn liveness(&self) -> CancellationToken {
        self.liveness.clone()
    }

    /// Whether `release` has already been called.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Releases the lock and closes its session.
    ///
    /// The server-side `RELEASE_LOCK` is best effort: closing the session
    /// drops the lock regardless. Returns the close error, if any. Every call
    /// after the first returns [`LockError::AlreadyReleased`] and has no
    /// effect.
    #[instrument(skip(self), fields(lock.key = %self.key, backend = "mysql"))]
    pub async fn release(&self) -> LockResult<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Err(LockError::AlreadyReleased);
        }

        self.release_requested.cancel();

        // The task only returns the session after its loop has exited, so no
        // ping can race with the teardown below.
        let refresher = self
            .refresher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let result = match refresher {
            Some(task) => match task.await {
                Ok(Some(connection)) => teardown(connection, &self.key).await,
                Ok(None) => Ok(()),
                // The task's session guard has already closed the session.
                Err(e) => Err(LockError::RefreshTask(e)),
            },
            None => Ok(()),
        };

        self.liveness.cancel();
        result
    }
}

impl<C: SessionConnection> fmt::Debug for LockHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockHandle")
            .field("key", &self.key)
            .field("live", &!self.liveness.is_cancelled())
            .field("released", &self.is_released())
            .finish()
    }
}

impl<C: SessionConnection> Drop for LockHandle<C> {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        self.release_requested.cancel();
        self.liveness.cancel();

        let refresher = self
            .refresher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        // Drop is synchronous and may run off the runtime, so the session is
        // closed on a task spawned on the runtime captured at construction.
        // It must not go back to the pool while it may still hold the lock.
        if let Some(task) = refresher {
            let key = std::mem::take(&mut self.key);
            self.runtime.spawn(async move {
                if let Ok(Some(connection)) = task.await {
                    if let Err(e) = teardown(connection, &key).await {
                        debug!(lock.key = %key, "teardown of dropped lock failed: {}", e);
                    }
                }
            });
        }
    }
}

/// The lock's session while the refresh task owns it.
///
/// Dropping the guard cancels liveness. If the session was not handed back
/// (the task panicked or was aborted) it is closed on the runtime rather than
/// returned to the pool.
struct SessionGuard<C: SessionConnection> {
    connection: Option<C>,
    liveness: CancellationToken,
    runtime: Handle,
}

impl<C: SessionConnection> SessionGuard<C> {
    fn new(connection: C, liveness: CancellationToken, runtime: Handle) -> Self {
        Self {
            connection: Some(connection),
            liveness,
            runtime,
        }
    }
}

impl<C: SessionConnection> Drop for SessionGuard<C> {
    fn drop(&mut self) {
        self.liveness.cancel();

        if let Some(connection) = self.connection.take() {
            self.runtime.spawn(async move {
                if let Err(e) = connection.close().await {
                    debug!("failed to close session of abandoned lock: {}", e);
                }
            });
        }
    }
}

/// Keeps pinging the lock's session until a ping fails or release is
/// requested, then cancels liveness and hands the session back.
async fn refresh<C: SessionConnection>(
    mut session: SessionGuard<C>,
    key: String,
    refresh_interval: Duration,
    release_requested: CancellationToken,
) -> Option<C> {
    let mut ticker = interval_at(Instant::now() + refresh_interval, refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = release_requested.cancelled() => {
                debug!(lock.key = %key, "release requested, stopping refresh");
                break;
            }
            _ = ticker.tick() => {
                let Some(connection) = session.connection.as_mut() else {
                    break;
                };
                // A fresh connection would not hold the lock, so any failure
                // here is final.
                match timeout(refresh_interval, connection.ping()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(lock.key = %key, "MySQL lock refresh failed, lock lost: {}", e);
                        break;
                    }
                    Err(_) => {
                        warn!(
                            lock.key = %key,
                            "MySQL lock refresh exceeded {:?}, lock lost",
                            refresh_interval
                        );
                        break;
                    }
                }
            }
        }
    }

    // Dropping the guard cancels liveness.
    session.connection.take()
}

async fn teardown<C: SessionConnection>(mut connection: C, key: &str) -> LockResult<()> {
    if let Err(e) = connection.release_lock(key).await {
        debug!(lock.key = %key, "RELEASE_LOCK failed, closing session anyway: {}", e);
    }
    connection.close().await.map_err(LockError::Close)
}
