//! Host side: accept peers, admit them into the roster, and feed their
//! action frames to the arbiter.
//!
//! The flow for each incoming connection:
//!   1. Roster full → send the capacity-exceeded frame and close.
//!   2. Otherwise → send `Connected`, assign the next player number, and
//!      spawn a reader task for that peer.
//!   3. The reader turns each action frame into a toggle request tagged
//!      with the peer's id until the peer says `Disconnect` or the link
//!      drops, then removes the peer and releases anything it owned.

use std::sync::Arc;
use std::time::Duration;

use rampctl_arbiter::{ActionRequest, ArbiterHandle};
use rampctl_protocol::{Codec, Frame, PeerId, TextCodec};
use rampctl_transport::{Connection, Endpoint, Transport};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::{
    DeviceDirectory, ListenerConfig, Roster, SessionError, SessionEvent,
    SessionStatus,
};

/// Pause before retrying after a failed `accept`.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(250);

/// State shared between the listener, its accept loop and peer readers.
struct ListenerShared<C> {
    roster: Mutex<Roster<C>>,
    arbiter: ArbiterHandle,
    status: watch::Sender<SessionStatus>,
    events: mpsc::UnboundedSender<SessionEvent>,
    codec: TextCodec,
}

impl<C: Connection> ListenerShared<C> {
    /// Records a status change and emits it. Repeated values are ignored,
    /// so each transition is reported once.
    fn set_status(&self, status: SessionStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            tracing::info!(%status, "host status changed");
            let _ = self.events.send(SessionEvent::Status(status));
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    async fn send_frame(&self, conn: &C, frame: &Frame) -> Result<(), SessionError> {
        let bytes = self.codec.encode(frame)?;
        conn.send(&bytes).await?;
        Ok(())
    }
}

struct Running {
    stop: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
    endpoint: Endpoint,
}

/// Host-side connection listener.
///
/// Generic over the [`Transport`] so the same logic runs over TCP in tests
/// and over the real radio link in production.
pub struct Listener<T: Transport, D: DeviceDirectory> {
    config: ListenerConfig,
    directory: D,
    shared: Arc<ListenerShared<T::Connection>>,
    running: Option<Running>,
}

impl<T: Transport, D: DeviceDirectory> Listener<T, D> {
    /// Creates a stopped listener and the receiver for its events.
    pub fn new(
        config: ListenerConfig,
        directory: D,
        arbiter: ArbiterHandle,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let config = config.validated();
        let (events, rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(SessionStatus::Disconnected);

        let shared = Arc::new(ListenerShared {
            roster: Mutex::new(Roster::new(config.capacity())),
            arbiter,
            status,
            events,
            codec: TextCodec,
        });

        let listener = Self {
            config,
            directory,
            shared,
            running: None,
        };
        (listener, rx)
    }

    /// Binds the local adapter and starts accepting peers in the background.
    ///
    /// Emits `Initializing`, then `Waiting` once bound. Returns the bound
    /// endpoint.
    ///
    /// # Errors
    /// On [`SessionError::NoLocalAdapter`] or [`SessionError::BindFailed`]
    /// the status becomes `Error`; [`stop`](Self::stop) still works.
    pub async fn start(&mut self) -> Result<Endpoint, SessionError> {
        if self.running.is_some() {
            return Err(SessionError::AlreadyStarted);
        }
        self.shared.set_status(SessionStatus::Initializing);

        let (transport, endpoint) = match self.bind().await {
            Ok(bound) => bound,
            Err(e) => {
                tracing::error!(error = %e, "host failed to start");
                self.shared.set_status(SessionStatus::Error);
                return Err(e);
            }
        };

        let (stop, stop_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(
            transport,
            Arc::clone(&self.shared),
            stop_rx,
        ));

        tracing::info!(
            %endpoint,
            capacity = self.config.capacity(),
            "waiting for peers"
        );
        self.shared.set_status(SessionStatus::Waiting);
        self.running = Some(Running {
            stop,
            accept_task,
            endpoint: endpoint.clone(),
        });
        Ok(endpoint)
    }

    /// Binds the local adapter and resolves the endpoint actually bound.
    async fn bind(&self) -> Result<(T, Endpoint), SessionError> {
        let adapter = self
            .directory
            .local_adapter()
            .await?
            .ok_or(SessionError::NoLocalAdapter)?;
        let requested = Endpoint::new(adapter.address, self.config.channel);
        let transport = T::bind(&requested)
            .await
            .map_err(SessionError::BindFailed)?;
        let bound = transport
            .local_endpoint()
            .map_err(SessionError::BindFailed)?;
        Ok((transport, bound))
    }

    /// Disconnects every peer and closes the listening endpoint.
    ///
    /// Safe to call at any time and more than once; failures while saying
    /// goodbye to peers are ignored.
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.stop.send_replace(true);
            let _ = running.accept_task.await;
        }

        let departed = self.shared.roster.lock().await.drain();
        for entry in departed {
            let _ = self.shared.send_frame(&entry.conn, &Frame::Disconnect).await;
            let _ = entry.conn.close().await;
            let _ = self.shared.arbiter.release(entry.peer).await;
            tracing::debug!(peer = %entry.peer, "peer disconnected by host");
        }

        self.shared.set_status(SessionStatus::Disconnected);
        tracing::info!("host stopped");
    }

    pub fn status(&self) -> SessionStatus {
        *self.shared.status.borrow()
    }

    /// A receiver notified on every status change.
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status.subscribe()
    }

    /// Peers currently in the roster, in join order.
    pub async fn peers(&self) -> Vec<PeerId> {
        self.shared.roster.lock().await.peers()
    }

    /// Number of peers this host admits.
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    /// The endpoint bound by [`start`](Self::start), while running.
    pub fn local_endpoint(&self) -> Option<&Endpoint> {
        self.running.as_ref().map(|r| &r.endpoint)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// The arbiter this host feeds.
    pub fn arbiter(&self) -> &ArbiterHandle {
        &self.shared.arbiter
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

async fn accept_loop<T: Transport>(
    mut transport: T,
    shared: Arc<ListenerShared<T::Connection>>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let accepted = tokio::select! {
            _ = stopped(&mut stop) => break,
            res = transport.accept() => res,
        };
        match accepted {
            Ok(conn) => admit(&shared, conn).await,
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
                tokio::select! {
                    _ = stopped(&mut stop) => break,
                    _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                }
            }
        }
    }

    if let Err(e) = transport.shutdown().await {
        tracing::warn!(error = %e, "transport shutdown failed");
    }
    tracing::debug!("accept loop finished");
}

async fn stopped(stop: &mut watch::Receiver<bool>) {
    while !*stop.borrow_and_update() {
        if stop.changed().await.is_err() {
            // The listener was dropped without stop().
            return;
        }
    }
}

async fn admit<C: Connection>(shared: &Arc<ListenerShared<C>>, conn: C) {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let mut roster = shared.roster.lock().await;

    if roster.is_full() {
        drop(roster);
        tracing::info!(%conn_id, "host full, rejecting connection");
        let _ = shared.send_frame(&conn, &Frame::CapacityExceeded).await;
        let _ = conn.close().await;
        return;
    }

    if let Err(e) = shared.send_frame(&conn, &Frame::Connected).await {
        drop(roster);
        tracing::warn!(%conn_id, error = %e, "failed to acknowledge connection");
        let _ = conn.close().await;
        return;
    }

    let peer = match roster.admit(Arc::clone(&conn)) {
        Ok(peer) => peer,
        Err(e) => {
            drop(roster);
            tracing::warn!(%conn_id, error = %e, "admission failed");
            let _ = conn.close().await;
            return;
        }
    };
    tracing::info!(%conn_id, %peer, peers = roster.len(), "peer joined");
    shared.emit(SessionEvent::PeerConnected(peer));
    if roster.is_full() {
        shared.set_status(SessionStatus::Connected);
    } else {
        shared.set_status(SessionStatus::Waiting);
    }
    drop(roster);

    tokio::spawn(read_peer(Arc::clone(shared), peer, conn));
}

/// Reads one peer's frames until it leaves.
async fn read_peer<C: Connection>(
    shared: Arc<ListenerShared<C>>,
    peer: PeerId,
    conn: Arc<C>,
) {
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%peer, "connection closed");
                break;
            }
            Err(e) => {
                // One peer's broken link must not affect the others.
                tracing::warn!(%peer, error = %e, "receive failed");
                break;
            }
        };

        match shared.codec.decode(&data) {
            Ok(Frame::Disconnect) => {
                tracing::debug!(%peer, "peer sent disconnect");
                break;
            }
            Ok(Frame::Action(code)) => {
                let request = ActionRequest::toggle(peer, code);
                match shared.arbiter.submit(request).await {
                    Ok(verdict) => {
                        tracing::debug!(%peer, ?verdict, "peer action handled");
                    }
                    Err(e) => {
                        tracing::warn!(%peer, error = %e, "arbiter unavailable");
                    }
                }
            }
            Ok(other) => {
                tracing::debug!(%peer, frame = other.as_text(), "ignoring control frame from peer");
            }
            Err(e) => {
                tracing::debug!(%peer, error = %e, "undecodable frame");
            }
        }
    }

    let _ = conn.close().await;
    depart(&shared, peer, &conn).await;
}

async fn depart<C: Connection>(shared: &ListenerShared<C>, peer: PeerId, conn: &Arc<C>) {
    let mut roster = shared.roster.lock().await;
    if roster.remove(peer, conn.id()).is_none() {
        // Already removed by stop().
        return;
    }
    if let Err(e) = shared.arbiter.release(peer).await {
        tracing::warn!(%peer, error = %e, "could not release ownership");
    }

    tracing::info!(%peer, peers = roster.len(), "peer left");
    shared.emit(SessionEvent::PeerDisconnected(peer));
    if roster.is_empty() {
        shared.set_status(SessionStatus::Disconnected);
    } else {
        shared.set_status(SessionStatus::Waiting);
    }
}
