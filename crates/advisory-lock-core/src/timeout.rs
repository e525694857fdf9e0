//! Server-side wait timeout values.

use std::fmt;
use std::time::Duration;

/// How long the server should wait for a busy lock before giving up.
///
/// Advisory lock functions take a whole number of seconds:
///
/// - negative - wait indefinitely
/// - `0` - try once and return immediately
/// - `n` - wait up to `n` seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaitTimeout {
    seconds: i64, // -1 for infinite
}

impl WaitTimeout {
    pub const INFINITE: Self = Self { seconds: -1 };
    pub const ZERO: Self = Self { seconds: 0 };

    pub const fn from_secs(seconds: u32) -> Self {
        Self {
            seconds: seconds as i64,
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.seconds < 0
    }

    pub fn is_zero(&self) -> bool {
        self.seconds == 0
    }

    /// The value bound as the timeout argument of the lock call.
    pub fn as_secs(&self) -> i64 {
        self.seconds
    }

    pub fn as_duration(&self) -> Option<Duration> {
        if self.is_infinite() {
            None
        } else {
            Some(Duration::from_secs(self.seconds as u64))
        }
    }
}

impl Default for WaitTimeout {
    fn default() -> Self {
        Self::INFINITE
    }
}

impl From<i64> for WaitTimeout {
    fn from(seconds: i64) -> Self {
        if seconds < 0 {
            Self::INFINITE
        } else {
            Self { seconds }
        }
    }
}

/// `None` waits forever. Sub-second remainders round up so that a short
/// positive duration never degrades into a try-once.
impl From<Option<Duration>> for WaitTimeout {
    fn from(timeout: Option<Duration>) -> Self {
        match timeout {
            None => Self::INFINITE,
            Some(d) => {
                let mut seconds = d.as_secs();
                if d.subsec_nanos() > 0 {
                    seconds += 1;
                }
                Self {
                    seconds: seconds.min(i64::MAX as u64) as i64,
                }
            }
        }
    }
}

impl fmt::Display for WaitTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            write!(f, "infinite wait")
        } else {
            write!(f, "{}s", self.seconds)
        }
    }
}
