//! Action arbitration for rampctl.
//!
//! Several originators (the host's own controls and every connected peer)
//! want to move one physical ramp. This crate makes sure only one of them
//! drives it at a time:
//!
//! - [`ArbiterState`] is the pure state machine: `Idle`, `Busy` with an
//!   owner, or `Locked` until a deadline after a drop.
//! - [`spawn_arbiter`] runs that state machine inside a Tokio task. Every
//!   producer talks to it through a cloneable [`ArbiterHandle`], so there
//!   is exactly one place where requests are serialized.
//! - [`ActuatorLink`] is where accepted codes go: a serial line, a network
//!   link to the host, or a channel in tests.
//!
//! ```text
//! local controls ─┐
//! peer reader 2  ─┼─→ ArbiterHandle ─→ [arbiter task] ─→ ActuatorLink
//! peer reader 3  ─┘
//! ```

mod actuator;
mod arbiter;
mod config;
mod error;
mod state;

pub use actuator::{ActuatorLink, ChannelActuator, LineActuator};
pub use arbiter::{spawn_arbiter, ArbiterHandle, ArbiterSnapshot};
pub use config::ArbiterConfig;
pub use error::ArbiterError;
pub use state::{
    ActionKind, ActionRequest, ArbiterState, Engagement, Rejection, Verdict,
};
