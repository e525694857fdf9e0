//! MySQL locker construction.

use std::fmt;
use std::time::Duration;

use sqlx::MySqlPool;

use advisory_lock_core::error::{LockError, LockResult};

use crate::client::LockerClient;
use crate::connection::{MySqlConnectionSource, MySqlSession};
use crate::handle::LockHandle;
use crate::options::LockerOptions;

/// Locker client backed by a `sqlx` MySQL pool.
pub type MySqlLocker = LockerClient<MySqlConnectionSource>;

/// Handle to a lock held on a MySQL session.
pub type MySqlLockHandle = LockHandle<MySqlSession>;

/// Where the locker's sessions come from.
enum Target {
    Url(String),
    Pool(MySqlPool),
}

/// Builder for MySQL locker configuration.
pub struct MySqlLockerBuilder {
    target: Option<Target>,
    options: LockerOptions,
}

impl MySqlLockerBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            target: None,
            options: LockerOptions::default(),
        }
    }

    /// Sets the MySQL connection string.
    pub fn connection_string(mut self, conn_str: impl Into<String>) -> Self {
        self.target = Some(Target::Url(conn_str.into()));
        self
    }

    /// Sets an existing connection pool.
    ///
    /// Every held lock keeps one pool connection checked out, so size the pool
    /// for the number of locks held at once plus regular traffic.
    pub fn pool(mut self, pool: MySqlPool) -> Self {
        self.target = Some(Target::Pool(pool));
        self
    }

    /// Sets how often the session holding each lock is pinged.
    ///
    /// A ping is also bounded by this interval, so a dead session is noticed
    /// within about twice the cadence.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.options = self.options.with_refresh_interval(interval);
        self
    }

    /// Builds the locker.
    pub async fn build(self) -> LockResult<MySqlLocker> {
        let pool = match self.target {
            Some(Target::Pool(pool)) => pool,
            Some(Target::Url(url)) => MySqlPool::connect(&url)
                .await
                .map_err(|e| LockError::ConnectionUnavailable(Box::new(e)))?,
            None => {
                return Err(LockError::InvalidConfig(
                    "connection not specified".to_string(),
                ));
            }
        };

        LockerClient::new(MySqlConnectionSource::new(pool), self.options)
    }
}

impl fmt::Debug for MySqlLockerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Connection strings may carry credentials.
        let target = match self.target {
            Some(Target::Url(_)) => "url([REDACTED])",
            Some(Target::Pool(_)) => "pool",
            None => "none",
        };
        f.debug_struct("MySqlLockerBuilder")
            .field("target", &target)
            .field("options", &self.options)
            .finish()
    }
}

impl Default for MySqlLockerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LockerClient<MySqlConnectionSource> {
    /// Returns a new builder for configuring a MySQL locker.
    pub fn builder() -> MySqlLockerBuilder {
        MySqlLockerBuilder::new()
    }

    /// Creates a locker using the specified connection string.
    pub async fn connect(connection_string: impl Into<String>) -> LockResult<Self> {
        Self::builder()
            .connection_string(connection_string)
            .build()
            .await
    }

    /// Creates a locker over an existing pool with default options.
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self::with_defaults(MySqlConnectionSource::new(pool))
    }
}
