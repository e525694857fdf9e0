//! Example demonstrating MySQL advisory locks with loss detection.

use std::time::Duration;

use advisory_lock::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Get MySQL connection string from environment or use default
    let url = std::env::var("MYSQL_URL").unwrap_or_else(|_| "mysql://root@localhost:3306/".to_string());

    let locker = MySqlLocker::builder()
        .connection_string(url)
        .refresh_interval(Duration::from_millis(500))
        .build()
        .await?;
    info!("connected");

    match locker.try_acquire("example-lock").await? {
        Some(handle) => {
            info!(key = handle.key(), "lock acquired, holding for 2 seconds");
            let lost = handle.liveness();

            tokio::select! {
                _ = lost.cancelled() => warn!("lock lost while working"),
                _ = tokio::time::sleep(Duration::from_secs(2)) => info!("work finished"),
            }

            handle.release().await?;
            info!("lock released");
        }
        None => info!("lock is currently held by another session"),
    }

    Ok(())
}
