//! Session configuration.

use rampctl_transport::DEFAULT_CHANNEL;
use serde::{Deserialize, Serialize};

/// Configuration for a host [`Listener`](crate::Listener).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Total players including the host's own operator.
    ///
    /// Clamped to `MIN_PLAYERS..=MAX_PLAYERS`; the listener admits
    /// `players - 1` peers.
    pub players: u8,

    /// Channel to listen on. Peers must use the same value.
    pub channel: u16,
}

impl ListenerConfig {
    pub const MIN_PLAYERS: u8 = 2;
    pub const MAX_PLAYERS: u8 = 4;

    pub fn with_players(players: u8) -> Self {
        Self {
            players,
            ..Default::default()
        }
    }

    /// Clamps the player count into the supported range.
    pub fn validated(mut self) -> Self {
        let clamped = self.players.clamp(Self::MIN_PLAYERS, Self::MAX_PLAYERS);
        if clamped != self.players {
            tracing::warn!(
                players = self.players,
                clamped,
                "player count out of range, clamping"
            );
            self.players = clamped;
        }
        self
    }

    /// Number of peers the host admits.
    pub fn capacity(&self) -> usize {
        usize::from(self.players.saturating_sub(1))
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            players: Self::MIN_PLAYERS,
            channel: DEFAULT_CHANNEL,
        }
    }
}

/// Configuration for a peer [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Channel the host listens on.
    pub channel: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL,
        }
    }
}
