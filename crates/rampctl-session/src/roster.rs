//! The host's record of connected peers.
//!
//! The roster hands out player numbers in join order, starting at
//! [`FIRST_REMOTE_PLAYER`], and never holds more than its capacity.
//! Numbers are not reused while the session runs: if Player 2 leaves, the
//! next peer to join is still given the next unused number. Only
//! [`drain`](Roster::drain) (the host stopping) resets the counter.
//!
//! Like the rest of the session state it is a plain struct; the listener
//! wraps it in a mutex.

use std::sync::Arc;

use rampctl_protocol::{PeerId, FIRST_REMOTE_PLAYER};
use rampctl_transport::{Connection, ConnectionId};

use crate::SessionError;

/// One admitted peer.
pub struct RosterEntry<C> {
    pub peer: PeerId,
    pub conn: Arc<C>,
}

/// Bounded set of connected peers.
pub struct Roster<C> {
    capacity: usize,
    next_player: u8,
    entries: Vec<RosterEntry<C>>,
}

impl<C: Connection> Roster<C> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_player: FIRST_REMOTE_PLAYER,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Admits a connection and assigns it the next player number.
    ///
    /// # Errors
    /// Returns [`SessionError::CapacityExceeded`] when the roster is full;
    /// the roster is unchanged.
    pub fn admit(&mut self, conn: Arc<C>) -> Result<PeerId, SessionError> {
        if self.is_full() {
            return Err(SessionError::CapacityExceeded);
        }
        let peer = PeerId::Player(self.next_player);
        self.next_player = self.next_player.saturating_add(1);
        self.entries.push(RosterEntry { peer, conn });
        Ok(peer)
    }

    /// Removes `peer`, but only if it is still backed by connection `id`.
    ///
    /// The id check keeps a late reader from an earlier session from
    /// evicting a newer peer that happens to have the same number.
    pub fn remove(&mut self, peer: PeerId, id: ConnectionId) -> Option<Arc<C>> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.peer == peer && e.conn.id() == id)?;
        Some(self.entries.remove(pos).conn)
    }

    /// Removes every peer and resets numbering.
    pub fn drain(&mut self) -> Vec<RosterEntry<C>> {
        self.next_player = FIRST_REMOTE_PLAYER;
        std::mem::take(&mut self.entries)
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.entries.iter().map(|e| e.peer).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
