//! Application configuration, loaded from a JSON file.
//!
//! ```json
//! {
//!   "players": 3,
//!   "channel": 4,
//!   "lockout_secs": 15,
//!   "local_adapter": { "name": "ramp-host", "address": "00:1A:7D:DA:71:13" },
//!   "devices": [
//!     { "name": "tablet-2", "address": "00:1A:7D:DA:71:14", "description": "left side" }
//!   ]
//! }
//! ```
//!
//! Every field is optional; missing ones take the defaults below.

use std::path::Path;
use std::time::Duration;

use rampctl_arbiter::ArbiterConfig;
use rampctl_session::{ClientConfig, DeviceInfo, ListenerConfig, StaticDirectory};
use rampctl_transport::DEFAULT_CHANNEL;
use serde::{Deserialize, Serialize};

use crate::RampctlError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RampConfig {
    /// Total players including the host's operator (2..=4).
    pub players: u8,

    /// Channel the host listens on and peers dial.
    pub channel: u16,

    /// Seconds all controls stay disabled after a drop.
    pub lockout_secs: u64,

    /// This machine's own adapter. Required to host.
    pub local_adapter: Option<DeviceInfo>,

    /// Paired devices a peer may dial.
    pub devices: Vec<DeviceInfo>,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            players: ListenerConfig::MIN_PLAYERS,
            channel: DEFAULT_CHANNEL,
            lockout_secs: ArbiterConfig::DEFAULT_LOCKOUT_MS / 1000,
            local_adapter: None,
            devices: Vec::new(),
        }
    }
}

impl RampConfig {
    /// Reads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RampctlError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RampctlError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), players = config.players, "config loaded");
        Ok(config)
    }

    /// Parses and validates a config from JSON text.
    pub fn from_json(text: &str) -> Result<Self, RampctlError> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config.validated())
    }

    /// Clamps the player count into the supported range.
    pub fn validated(mut self) -> Self {
        self.players = self.listener_config().validated().players;
        self
    }

    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            players: self.players,
            channel: self.channel,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            channel: self.channel,
        }
    }

    pub fn arbiter_config(&self) -> ArbiterConfig {
        ArbiterConfig::with_lockout(Duration::from_secs(self.lockout_secs))
    }

    /// A directory serving the configured adapter and paired devices.
    pub fn directory(&self) -> StaticDirectory {
        let mut directory = StaticDirectory::new();
        if let Some(adapter) = &self.local_adapter {
            directory = directory.with_local_adapter(adapter.clone());
        }
        self.devices
            .iter()
            .cloned()
            .fold(directory, StaticDirectory::with_paired)
    }
}
