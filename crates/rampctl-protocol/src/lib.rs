//! Wire protocol for rampctl.
//!
//! This crate defines what travels between a host and its peers:
//!
//! - **Identity** ([`PeerId`]): who originated an action request.
//! - **Actions** ([`ActionCode`], [`ActionClass`]): the opaque command
//!   strings understood by the ramp actuator, and how the arbiter should
//!   treat each one.
//! - **Frames** ([`Frame`]): reserved control messages plus action codes,
//!   and the [`Codec`] that turns them into bytes.
//!
//! ```text
//! Transport (frames as bytes) → Protocol (Frame) → Session / Arbiter
//! ```

mod action;
mod codec;
mod error;
mod frame;
mod peer;

pub use action::{codes, ActionClass, ActionCode};
pub use codec::{Codec, TextCodec};
pub use error::ProtocolError;
pub use frame::Frame;
pub use peer::{PeerId, FIRST_REMOTE_PLAYER};
