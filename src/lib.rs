//! Session-pinned MySQL advisory locks.
//!
//! A lock is taken with `GET_LOCK` on a connection that is then kept out of the
//! pool for as long as the lock is held. A background task pings that
//! connection; if it stops answering, the lock's liveness token is cancelled.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use advisory_lock::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let locker = MySqlLocker::builder()
//!         .connection_string("mysql://root@localhost:3306/")
//!         .refresh_interval(Duration::from_millis(500))
//!         .build()
//!         .await?;
//!
//!     // Wait up to 5 seconds server-side
//!     let handle = locker.acquire_timeout("my-resource", WaitTimeout::from_secs(5)).await?;
//!     let lost = handle.liveness();
//!
//!     tokio::select! {
//!         _ = lost.cancelled() => eprintln!("lock lost, stopping"),
//!         _ = tokio::time::sleep(Duration::from_secs(2)) => println!("work done"),
//!     }
//!
//!     handle.release().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! Acquisition distinguishes a cancelled caller (`AcquireCancelled`), a busy
//! lock (`LockTimeout`), a failing server (`LockServerError`) and an unreadable
//! response (`AcquireTransport`). Nothing is retried internally.
//!
//! # Crate Organization
//!
//! This is a meta-crate that re-exports types from:
//! - `advisory-lock-core`: errors, wait timeouts and driver traits
//! - `advisory-lock-mysql`: the locker client, lock handles and the `sqlx` adapter

// Re-export core types and traits
pub use advisory_lock_core::*;

// Re-export the MySQL backend
pub use advisory_lock_mysql::*;
