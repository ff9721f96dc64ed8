//! Session management for rampctl.
//!
//! A session is one device's view of the multi-device link:
//!
//! 1. **Host**: a [`Listener`] binds the local radio, admits up to
//!    `players - 1` peers into a [`Roster`], and turns every action frame a
//!    peer sends into a request for the arbiter.
//! 2. **Peer**: a [`Client`] resolves the host through the
//!    [`DeviceDirectory`], performs the admission handshake, and sends
//!    action frames.
//!
//! Both report progress the same way: a [`SessionStatus`] that can be
//! read or watched, and a stream of [`SessionEvent`]s.
//!
//! # How it fits in the stack
//!
//! ```text
//! rampctl (facade, config, key bindings)
//!     ↕
//! Session Layer (this crate)  ← who is connected, status, handshakes
//!     ↕                ↘
//! Protocol / Transport    Arbiter (single owner of the ramp)
//! ```

mod client;
mod config;
mod directory;
mod error;
mod listener;
mod roster;
mod status;

pub use client::{Client, PeerLink};
pub use config::{ClientConfig, ListenerConfig};
pub use directory::{DeviceDirectory, DeviceInfo, StaticDirectory};
pub use error::SessionError;
pub use listener::Listener;
pub use roster::{Roster, RosterEntry};
pub use status::{SessionEvent, SessionStatus};
