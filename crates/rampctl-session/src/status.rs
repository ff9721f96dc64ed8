//! Session status and the events a session reports.

use std::fmt;

use rampctl_protocol::PeerId;
use serde::{Deserialize, Serialize};

/// Where a session is in its lifecycle.
///
/// ```text
///   Disconnected ──start()──→ Initializing ──→ Waiting ──(roster full)──→ Connected
///        ↑                          │              ↑                         │
///        │                          ↓              └───(a peer leaves)───────┘
///        └──────stop()/empty─────  Error
/// ```
///
/// A peer skips `Waiting`: it goes from `Initializing` straight to
/// `Connected` once the host acknowledges it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Initializing,
    Waiting,
    Connected,
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "Disconnected",
            Self::Initializing => "Initializing",
            Self::Waiting => "Waiting",
            Self::Connected => "Connected",
            Self::Error => "Error",
        };
        f.write_str(s)
    }
}

/// Something a UI may want to react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event", content = "data")]
pub enum SessionEvent {
    /// The session status changed.
    Status(SessionStatus),
    /// A peer was admitted to the roster (host only).
    PeerConnected(PeerId),
    /// A peer left the roster (host only).
    PeerDisconnected(PeerId),
}
