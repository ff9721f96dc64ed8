//! Arbiter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the arbiter task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// How long all controls stay disabled after a drop, in milliseconds.
    ///
    /// Default: 15 000 ms, roughly the time the ball needs to settle.
    pub lockout_ms: u64,

    /// Capacity of the command channel. Producers wait when it is full.
    pub channel_size: usize,
}

impl ArbiterConfig {
    pub const DEFAULT_LOCKOUT_MS: u64 = 15_000;

    /// A config with the given lockout and default channel size.
    pub fn with_lockout(lockout: Duration) -> Self {
        Self {
            lockout_ms: u64::try_from(lockout.as_millis()).unwrap_or(u64::MAX),
            ..Default::default()
        }
    }

    pub fn lockout(&self) -> Duration {
        Duration::from_millis(self.lockout_ms)
    }
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            lockout_ms: Self::DEFAULT_LOCKOUT_MS,
            channel_size: 64,
        }
    }
}
