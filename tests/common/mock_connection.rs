//! In-memory advisory lock server for exercising lock handles without MySQL.

use std::collections::{HashMap, HashSet};
use std::future::pending;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use advisory_lock_core::error::BoxError;
use advisory_lock_core::timeout::WaitTimeout;
use advisory_lock_core::traits::{ConnectionSource, SessionConnection};
use tokio::sync::Notify;
use tokio::time::{Instant, timeout_at};

#[derive(Default)]
struct ServerState {
    next_session: u64,
    /// Lock name to holding session.
    locks: HashMap<String, u64>,
    /// Sessions killed server-side.
    killed: HashSet<u64>,
    /// Sessions not yet closed, pooled or checked out.
    open: HashSet<u64>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<ServerState>,
    lock_released: Notify,
    unavailable: AtomicBool,
    read_failure: AtomicBool,
    hang_pings: AtomicBool,
    panic_pings: AtomicBool,
    close_failure: AtomicBool,
    pool_blocked: AtomicBool,
    status_override: Mutex<Option<i64>>,
    pings: AtomicUsize,
    release_calls: AtomicUsize,
    closes: AtomicUsize,
    pool_returns: AtomicUsize,
}

impl Inner {
    fn drop_locks_of(&self, state: &mut ServerState, session: u64) {
        state.locks.retain(|_, holder| *holder != session);
        self.lock_released.notify_waiters();
    }
}

/// Mock MySQL server with `GET_LOCK` semantics: named locks owned by sessions,
/// dropped when the owning session ends.
#[derive(Clone, Default)]
pub struct MockServer {
    inner: Arc<Inner>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pool handing out sessions on this server.
    pub fn source(&self) -> MockSource {
        MockSource {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Makes the pool refuse to hand out sessions.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes every `GET_LOCK` response unreadable.
    pub fn set_read_failure(&self, fail: bool) {
        self.inner.read_failure.store(fail, Ordering::SeqCst);
    }

    /// Makes pings never answer.
    pub fn set_hang_pings(&self, hang: bool) {
        self.inner.hang_pings.store(hang, Ordering::SeqCst);
    }

    /// Makes pings panic.
    pub fn set_panic_pings(&self, panic: bool) {
        self.inner.panic_pings.store(panic, Ordering::SeqCst);
    }

    /// Makes `close` report an error. The session still ends.
    pub fn set_close_failure(&self, fail: bool) {
        self.inner.close_failure.store(fail, Ordering::SeqCst);
    }

    /// Makes the pool wait forever for a free session.
    pub fn set_pool_blocked(&self, blocked: bool) {
        self.inner.pool_blocked.store(blocked, Ordering::SeqCst);
    }

    /// Forces the status returned by `GET_LOCK`.
    pub fn set_status_override(&self, status: Option<i64>) {
        *self.inner.status_override.lock().unwrap() = status;
    }

    /// Kills every open session, dropping the locks they hold.
    pub fn kill_sessions(&self) {
        let mut state = self.inner.state.lock().unwrap();
        let open: Vec<u64> = state.open.iter().copied().collect();
        for session in open {
            state.killed.insert(session);
            self.inner.drop_locks_of(&mut state, session);
        }
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.inner.state.lock().unwrap().locks.contains_key(name)
    }

    pub fn ping_count(&self) -> usize {
        self.inner.pings.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.inner.release_calls.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    pub fn pool_returns(&self) -> usize {
        self.inner.pool_returns.load(Ordering::SeqCst)
    }
}

/// Pool side of [`MockServer`].
pub struct MockSource {
    inner: Arc<Inner>,
}

impl ConnectionSource for MockSource {
    type Connection = MockSession;

    async fn acquire_connection(&self) -> Result<MockSession, BoxError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused").into());
        }
        if self.inner.pool_blocked.load(Ordering::SeqCst) {
            pending::<()>().await;
        }

        let mut state = self.inner.state.lock().unwrap();
        state.next_session += 1;
        let id = state.next_session;
        state.open.insert(id);

        Ok(MockSession {
            id,
            inner: Arc::clone(&self.inner),
            closed: false,
        })
    }
}

/// One session on the mock server.
pub struct MockSession {
    id: u64,
    inner: Arc<Inner>,
    closed: bool,
}

impl MockSession {
    fn check_alive(&self) -> Result<(), BoxError> {
        if self.inner.state.lock().unwrap().killed.contains(&self.id) {
            return Err(
                io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer").into(),
            );
        }
        Ok(())
    }
}

impl SessionConnection for MockSession {
    async fn get_lock(&mut self, name: &str, wait: WaitTimeout) -> Result<i64, BoxError> {
        self.check_alive()?;

        if self.inner.read_failure.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "malformed packet").into());
        }

        let status_override = *self.inner.status_override.lock().unwrap();
        if let Some(status) = status_override {
            return Ok(status);
        }

        let deadline = wait.as_duration().map(|d| Instant::now() + d);

        loop {
            // Registered before checking so a release in between is not missed.
            let released = self.inner.lock_released.notified();

            {
                let mut state = self.inner.state.lock().unwrap();
                match state.locks.get(name) {
                    Some(&holder) if holder != self.id => {}
                    _ => {
                        state.locks.insert(name.to_string(), self.id);
                        return Ok(1);
                    }
                }
            }

            if wait.is_zero() {
                return Ok(0);
            }

            match deadline {
                Some(deadline) => {
                    if timeout_at(deadline, released).await.is_err() {
                        return Ok(0);
                    }
                }
                None => released.await,
            }
        }
    }

    async fn release_lock(&mut self, name: &str) -> Result<(), BoxError> {
        self.inner.release_calls.fetch_add(1, Ordering::SeqCst);
        self.check_alive()?;

        let mut state = self.inner.state.lock().unwrap();
        if state.locks.get(name) == Some(&self.id) {
            state.locks.remove(name);
            self.inner.lock_released.notify_waiters();
        }
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), BoxError> {
        self.inner.pings.fetch_add(1, Ordering::SeqCst);
        self.check_alive()?;

        if self.inner.panic_pings.load(Ordering::SeqCst) {
            panic!("session {} ping panicked", self.id);
        }
        if self.inner.hang_pings.load(Ordering::SeqCst) {
            pending::<()>().await;
        }
        Ok(())
    }

    async fn close(mut self) -> Result<(), BoxError> {
        self.closed = true;
        self.inner.closes.fetch_add(1, Ordering::SeqCst);

        {
            let mut state = self.inner.state.lock().unwrap();
            state.open.remove(&self.id);
            self.inner.drop_locks_of(&mut state, self.id);
        }

        if self.inner.close_failure.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe").into());
        }
        Ok(())
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        // Back to the pool: the session, and any lock it holds, lives on.
        if !self.closed {
            self.inner.pool_returns.fetch_add(1, Ordering::SeqCst);
        }
    }
}
