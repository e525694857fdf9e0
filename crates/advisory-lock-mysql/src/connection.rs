//! MySQL connection management for advisory locks.

use sqlx::pool::PoolConnection;
use sqlx::{Connection, MySql, MySqlPool};

use advisory_lock_core::error::BoxError;
use advisory_lock_core::timeout::WaitTimeout;
use advisory_lock_core::traits::{ConnectionSource, SessionConnection};

/// `GET_LOCK` returns NULL on internal errors; fold that into status `2`.
const GET_LOCK_SQL: &str = "SELECT COALESCE(GET_LOCK(?, ?), 2)";
const RELEASE_LOCK_SQL: &str = "DO RELEASE_LOCK(?)";

/// Hands out sessions from a `sqlx` MySQL pool.
#[derive(Debug, Clone)]
pub struct MySqlConnectionSource {
    pool: MySqlPool,
}

impl MySqlConnectionSource {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

impl ConnectionSource for MySqlConnectionSource {
    type Connection = MySqlSession;

    async fn acquire_connection(&self) -> Result<MySqlSession, BoxError> {
        let connection = self.pool.acquire().await?;
        Ok(MySqlSession { connection })
    }
}

/// One pooled MySQL session.
///
/// Dropping it returns the session to the pool; [`close`](SessionConnection::close)
/// detaches it from the pool and ends it.
pub struct MySqlSession {
    connection: PoolConnection<MySql>,
}

impl SessionConnection for MySqlSession {
    async fn get_lock(&mut self, name: &str, wait: WaitTimeout) -> Result<i64, BoxError> {
        let status: i64 = sqlx::query_scalar(GET_LOCK_SQL)
            .bind(name)
            .bind(wait.as_secs())
            .fetch_one(&mut *self.connection)
            .await?;
        Ok(status)
    }

    async fn release_lock(&mut self, name: &str) -> Result<(), BoxError> {
        sqlx::query(RELEASE_LOCK_SQL)
            .bind(name)
            .execute(&mut *self.connection)
            .await?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), BoxError> {
        (*self.connection).ping().await?;
        Ok(())
    }

    async fn close(self) -> Result<(), BoxError> {
        self.connection.detach().close().await?;
        Ok(())
    }
}
