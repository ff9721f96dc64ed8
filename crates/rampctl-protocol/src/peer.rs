//! Originator identities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Player number handed to the first peer that joins a host.
///
/// The host's own operator is implicitly player 1.
pub const FIRST_REMOTE_PLAYER: u8 = 2;

/// Who originated an action request.
///
/// `Local` is the host's own controls; `Player(n)` is a connected peer,
/// numbered in join order starting at [`FIRST_REMOTE_PLAYER`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PeerId {
    Local,
    Player(u8),
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Player(n) => write!(f, "Player {n}"),
        }
    }
}
