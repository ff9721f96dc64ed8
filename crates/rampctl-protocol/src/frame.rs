//! Control frames exchanged between host and peers.

use serde::{Deserialize, Serialize};

use crate::{ActionCode, ProtocolError};

/// One message on a host/peer link.
///
/// Three literals are reserved for session control; every other frame is
/// an action code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// Host → peer: the connection was admitted.
    Connected,
    /// Host → peer: the host is full; the connection is about to close.
    CapacityExceeded,
    /// Either direction: the sender is leaving.
    Disconnect,
    /// Peer → host: an action request.
    Action(ActionCode),
}

impl Frame {
    pub const CONNECTED: &'static str = "Connected";
    pub const CAPACITY_EXCEEDED: &'static str = "Max clients connected";
    pub const DISCONNECT: &'static str = "Disconnect";

    /// Parses one frame's text. Surrounding whitespace is ignored.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        match text.trim() {
            "" => Err(ProtocolError::EmptyFrame),
            Self::CONNECTED => Ok(Self::Connected),
            Self::CAPACITY_EXCEEDED => Ok(Self::CapacityExceeded),
            Self::DISCONNECT => Ok(Self::Disconnect),
            code => ActionCode::new(code).map(Self::Action),
        }
    }

    /// The text carried on the wire for this frame.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Connected => Self::CONNECTED,
            Self::CapacityExceeded => Self::CAPACITY_EXCEEDED,
            Self::Disconnect => Self::DISCONNECT,
            Self::Action(code) => code.as_str(),
        }
    }

    /// Whether this is one of the reserved session-control frames.
    pub fn is_control(&self) -> bool {
        !matches!(self, Self::Action(_))
    }
}

impl From<ActionCode> for Frame {
    fn from(code: ActionCode) -> Self {
        Self::Action(code)
    }
}
