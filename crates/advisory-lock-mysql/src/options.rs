//! Configuration options for the locker client.

use std::time::Duration;

/// Default cadence at which a held lock's connection is pinged.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Options applied to every lock taken through a [`LockerClient`](crate::LockerClient).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockerOptions {
    /// How often the connection holding a lock is pinged. Also bounds each
    /// ping, so loss is detected within roughly two intervals.
    pub refresh_interval: Duration,
}

impl LockerOptions {
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }
}

impl Default for LockerOptions {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}
