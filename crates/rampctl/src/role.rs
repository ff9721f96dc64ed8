//! Host or peer: one device's part in a session.

use rampctl_arbiter::{ActionRequest, ArbiterHandle, Verdict};
use rampctl_protocol::PeerId;
use rampctl_session::{
    Client, DeviceDirectory, Listener, SessionEvent, SessionStatus, StaticDirectory,
};
use rampctl_transport::{Connector, TcpConnector, TcpTransport, Transport};
use tokio::sync::{mpsc, watch};

use crate::{RampConfig, RampctlError};

/// The role this device plays in the session.
///
/// A host owns the arbiter and the actuator; a peer only forwards its
/// operator's codes to the host, whose arbiter decides.
pub enum Role<T: Transport, K: Connector, D: DeviceDirectory> {
    Host(Listener<T, D>),
    Peer(Client<K, D>),
}

/// The TCP flavour used by the console and the tests.
pub type TcpRole = Role<TcpTransport, TcpConnector, StaticDirectory>;

impl<T: Transport, K: Connector> Role<T, K, StaticDirectory> {
    /// A host configured from `config`, feeding `arbiter`.
    pub fn host(
        config: &RampConfig,
        arbiter: ArbiterHandle,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (listener, events) =
            Listener::new(config.listener_config(), config.directory(), arbiter);
        (Self::Host(listener), events)
    }

    /// A peer configured from `config`. Select a host with
    /// [`Client::resolve`] before starting.
    pub fn peer(
        config: &RampConfig,
        connector: K,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (client, events) = Client::new(config.client_config(), connector, config.directory());
        (Self::Peer(client), events)
    }
}

impl<T: Transport, K: Connector, D: DeviceDirectory> Role<T, K, D> {
    /// Starts listening (host) or connects to the selected host (peer).
    pub async fn start(&mut self) -> Result<(), RampctlError> {
        match self {
            Self::Host(listener) => {
                listener.start().await?;
            }
            Self::Peer(client) => client.start().await?,
        }
        Ok(())
    }

    pub async fn stop(&mut self) {
        match self {
            Self::Host(listener) => listener.stop().await,
            Self::Peer(client) => client.stop().await,
        }
    }

    /// Handles a request from this device's own controls.
    ///
    /// A host evaluates it as `Local` and returns the verdict. A peer sends
    /// the code to the host and returns `None`: the host treats every peer
    /// frame as a toggle, so a hold becomes press-to-start and
    /// release-to-stop there.
    pub async fn submit(&self, request: ActionRequest) -> Result<Option<Verdict>, RampctlError> {
        match self {
            Self::Host(listener) => {
                let request = ActionRequest {
                    originator: PeerId::Local,
                    ..request
                };
                Ok(Some(listener.arbiter().submit(request).await?))
            }
            Self::Peer(client) => {
                client.send(&request.code).await?;
                Ok(None)
            }
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Host(listener) => listener.status(),
            Self::Peer(client) => client.status(),
        }
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        match self {
            Self::Host(listener) => listener.watch_status(),
            Self::Peer(client) => client.watch_status(),
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host(_))
    }

    /// The arbiter, for a host.
    pub fn arbiter(&self) -> Option<&ArbiterHandle> {
        match self {
            Self::Host(listener) => Some(listener.arbiter()),
            Self::Peer(_) => None,
        }
    }
}
