//! Peer side: connect to a host and send it action frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rampctl_arbiter::{ActuatorLink, ArbiterError};
use rampctl_protocol::{ActionCode, Codec, Frame, TextCodec};
use rampctl_transport::{Connection, Connector, Endpoint};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::{
    ClientConfig, DeviceDirectory, DeviceInfo, SessionError, SessionEvent,
    SessionStatus,
};

/// State shared between the client, its reader task and any [`PeerLink`].
struct ClientShared<K> {
    conn: Mutex<Option<Arc<K>>>,
    /// `true` between a successful handshake and the first of `stop()` or
    /// the link dropping. Whoever flips it to `false` reports the outcome.
    running: AtomicBool,
    status: watch::Sender<SessionStatus>,
    events: mpsc::UnboundedSender<SessionEvent>,
    codec: TextCodec,
}

impl<K: Connection> ClientShared<K> {
    fn set_status(&self, status: SessionStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            tracing::info!(%status, "peer status changed");
            let _ = self.events.send(SessionEvent::Status(status));
        }
    }

    async fn send_frame(&self, frame: &Frame) -> Result<(), SessionError> {
        let conn = self
            .conn
            .lock()
            .await
            .clone()
            .ok_or(SessionError::NotConnected)?;
        self.send_frame_on(&conn, frame).await
    }

    async fn send_frame_on(&self, conn: &K, frame: &Frame) -> Result<(), SessionError> {
        let bytes = self.codec.encode(frame)?;
        conn.send(&bytes).await?;
        Ok(())
    }
}

/// Peer-side connection client.
///
/// ```text
/// resolve(name) → start() ──handshake──→ Connected ──send(code)…──→ stop()
/// ```
pub struct Client<C: Connector, D: DeviceDirectory> {
    config: ClientConfig,
    connector: C,
    directory: D,
    target: Option<DeviceInfo>,
    shared: Arc<ClientShared<C::Connection>>,
    reader: Option<JoinHandle<()>>,
}

impl<C: Connector, D: DeviceDirectory> Client<C, D> {
    /// Creates a disconnected client and the receiver for its events.
    pub fn new(
        config: ClientConfig,
        connector: C,
        directory: D,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(SessionStatus::Disconnected);
        let shared = Arc::new(ClientShared {
            conn: Mutex::new(None),
            running: AtomicBool::new(false),
            status,
            events,
            codec: TextCodec,
        });

        let client = Self {
            config,
            connector,
            directory,
            target: None,
            shared,
            reader: None,
        };
        (client, rx)
    }

    /// Names of every paired device, for a picker.
    pub async fn list_paired_devices(&self) -> Result<Vec<DeviceInfo>, SessionError> {
        self.directory.paired_devices().await
    }

    /// Looks up a paired device by name and selects it as the host to dial.
    pub async fn resolve(&mut self, name: &str) -> Result<DeviceInfo, SessionError> {
        let device = self
            .directory
            .paired_devices()
            .await?
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| SessionError::UnknownDevice(name.to_owned()))?;
        tracing::debug!(name, address = %device.address, "host selected");
        self.target = Some(device.clone());
        Ok(device)
    }

    /// Selects a host directly, bypassing the directory.
    pub fn set_target(&mut self, device: DeviceInfo) {
        self.target = Some(device);
    }

    pub fn target(&self) -> Option<&DeviceInfo> {
        self.target.as_ref()
    }

    /// Connects to the selected host and waits for its acknowledgement.
    ///
    /// Emits `Initializing`, then `Connected` on success or `Error` if the
    /// host is full, answers with anything else, or cannot be reached.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if self.shared.running.load(Ordering::SeqCst) {
            return Err(SessionError::AlreadyStarted);
        }
        let target = self.target.clone().ok_or(SessionError::NoTargetSelected)?;
        if let Some(reader) = self.reader.take() {
            let _ = reader.await;
        }
        self.shared.set_status(SessionStatus::Initializing);

        let endpoint = Endpoint::new(target.address, self.config.channel);
        let conn = match self.connector.connect(&endpoint).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(%endpoint, error = %e, "could not reach host");
                self.shared.set_status(SessionStatus::Error);
                return Err(SessionError::ConnectFailed(e));
            }
        };

        if let Err(e) = self.handshake(&conn).await {
            tracing::warn!(%endpoint, error = %e, "host refused connection");
            let _ = conn.close().await;
            self.shared.set_status(SessionStatus::Error);
            return Err(e);
        }

        let conn = Arc::new(conn);
        *self.shared.conn.lock().await = Some(Arc::clone(&conn));
        self.shared.running.store(true, Ordering::SeqCst);
        self.shared.set_status(SessionStatus::Connected);
        tracing::info!(%endpoint, host = %target.name, "connected to host");

        self.reader = Some(tokio::spawn(read_host(Arc::clone(&self.shared), conn)));
        Ok(())
    }

    async fn handshake(&self, conn: &C::Connection) -> Result<(), SessionError> {
        let data = conn.recv().await?.ok_or_else(|| {
            SessionError::Handshake("host closed before acknowledging".into())
        })?;
        match self.shared.codec.decode(&data)? {
            Frame::Connected => Ok(()),
            Frame::CapacityExceeded => Err(SessionError::CapacityExceeded),
            other => Err(SessionError::Handshake(format!(
                "unexpected first frame {:?}",
                other.as_text()
            ))),
        }
    }

    /// Sends one action code to the host.
    ///
    /// Fire-and-forget: the host does not answer, and whether the action
    /// was accepted is decided by its arbiter.
    pub async fn send(&self, code: &ActionCode) -> Result<(), SessionError> {
        self.shared.send_frame(&Frame::Action(code.clone())).await
    }

    /// A cloneable link that forwards codes to the host; see [`PeerLink`].
    pub fn link(&self) -> PeerLink<C::Connection> {
        PeerLink {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Tells the host we are leaving and closes the connection.
    ///
    /// Idempotent and safe from any status, `Error` included; always ends
    /// `Disconnected`, emitting it once.
    pub async fn stop(&mut self) {
        if self.shared.running.swap(false, Ordering::SeqCst) {
            let conn = self.shared.conn.lock().await.take();
            if let Some(conn) = conn {
                let _ = self
                    .shared
                    .send_frame_on(&conn, &Frame::Disconnect)
                    .await;
                let _ = conn.close().await;
            }
            tracing::info!("disconnected from host");
        }
        self.shared.set_status(SessionStatus::Disconnected);
        if let Some(reader) = self.reader.take() {
            let _ = reader.await;
        }
    }

    pub fn status(&self) -> SessionStatus {
        *self.shared.status.borrow()
    }

    /// A receiver notified on every status change.
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}

/// Watches the host side of the link. The host never sends actions, so
/// the only frames that matter are `Disconnect` and closure.
async fn read_host<K: Connection>(shared: Arc<ClientShared<K>>, conn: Arc<K>) {
    let outcome = loop {
        match conn.recv().await {
            Ok(Some(data)) => match shared.codec.decode(&data) {
                Ok(Frame::Disconnect) => {
                    tracing::info!("host ended the session");
                    break SessionStatus::Disconnected;
                }
                Ok(frame) => {
                    tracing::debug!(frame = frame.as_text(), "ignoring frame from host");
                }
                Err(e) => tracing::debug!(error = %e, "undecodable frame from host"),
            },
            Ok(None) => break SessionStatus::Disconnected,
            Err(e) => {
                tracing::warn!(error = %e, "link to host failed");
                break SessionStatus::Error;
            }
        }
    };

    // stop() may have got here first; only one side reports.
    if shared.running.swap(false, Ordering::SeqCst) {
        shared.conn.lock().await.take();
        let _ = conn.close().await;
        shared.set_status(outcome);
    }
}

/// Forwards codes to the host over a client's connection.
///
/// Lets a peer run its own arbiter (for immediate local feedback) whose
/// accepted codes go to the host instead of to a motor.
pub struct PeerLink<K> {
    shared: Arc<ClientShared<K>>,
}

impl<K> Clone for PeerLink<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K: Connection> ActuatorLink for PeerLink<K> {
    async fn send(&self, code: &ActionCode) -> Result<(), ArbiterError> {
        self.shared
            .send_frame(&Frame::Action(code.clone()))
            .await
            .map_err(|e| ArbiterError::LinkClosed(e.to_string()))
    }
}
