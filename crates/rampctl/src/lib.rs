//! # rampctl
//!
//! Multi-device command arbitration for a shared ramp actuator.
//!
//! One device hosts: it binds its radio, admits up to three peer devices,
//! and runs the arbiter that decides which single originator may move the
//! ramp at any moment. Peers connect and send action codes; the host's
//! own operator submits requests directly.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rampctl::prelude::*;
//!
//! # async fn run() -> Result<(), RampctlError> {
//! let config = RampConfig::load("rampctl.json")?;
//! let (link, _codes) = ChannelActuator::new();
//! let arbiter = spawn_arbiter(config.arbiter_config(), link);
//!
//! let (mut role, _events) = TcpRole::host(&config, arbiter);
//! role.start().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod controls;
mod error;
mod role;

pub use config::RampConfig;
pub use controls::{Binding, CalibrationPreset, KeyEdge, KeyInput, KeyMap};
pub use error::RampctlError;
pub use role::{Role, TcpRole};

pub use rampctl_arbiter as arbiter;
pub use rampctl_protocol as protocol;
pub use rampctl_session as session;
pub use rampctl_transport as transport;

/// Everything needed to run a host or a peer.
pub mod prelude {
    pub use crate::{
        Binding, CalibrationPreset, KeyEdge, KeyInput, KeyMap, RampConfig, RampctlError, Role,
        TcpRole,
    };
    pub use rampctl_arbiter::{
        spawn_arbiter, ActionKind, ActionRequest, ActuatorLink, ArbiterConfig, ArbiterHandle,
        ArbiterSnapshot, ArbiterState, ChannelActuator, LineActuator, Rejection, Verdict,
    };
    pub use rampctl_protocol::{codes, ActionCode, PeerId};
    pub use rampctl_session::{
        Client, DeviceDirectory, DeviceInfo, Listener, PeerLink, SessionEvent, SessionStatus,
        StaticDirectory,
    };
    pub use rampctl_transport::{Endpoint, TcpConnector, TcpTransport};
}
