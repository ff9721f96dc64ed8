//! Host/peer integration tests over loopback TCP.
//!
//! Every test binds the host on `127.0.0.1` channel 0 so the OS picks a
//! free port, then points clients at whatever port was bound.

use std::time::Duration;

use rampctl_arbiter::{
    spawn_arbiter, ActionRequest, ArbiterConfig, ArbiterHandle, ChannelActuator,
};
use rampctl_protocol::{codes, ActionCode, PeerId};
use rampctl_session::{
    Client, ClientConfig, DeviceInfo, Listener, ListenerConfig, SessionError,
    SessionEvent, SessionStatus, StaticDirectory,
};
use rampctl_transport::{Endpoint, TcpConnector, TcpTransport};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};

const WAIT: Duration = Duration::from_secs(2);

type Host = Listener<TcpTransport, StaticDirectory>;
type Peer = Client<TcpConnector, StaticDirectory>;

// =========================================================================
// Helpers
// =========================================================================

struct HostFixture {
    listener: Host,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    forwarded: mpsc::UnboundedReceiver<ActionCode>,
    endpoint: Endpoint,
}

async fn start_host(players: u8) -> HostFixture {
    let (link, forwarded) = ChannelActuator::new();
    let arbiter = spawn_arbiter(ArbiterConfig::default(), link);
    let directory = StaticDirectory::new()
        .with_local_adapter(DeviceInfo::new("host", "127.0.0.1"));
    let config = ListenerConfig {
        players,
        channel: 0,
    };

    let (mut listener, events) = Listener::new(config, directory, arbiter);
    let endpoint = listener.start().await.expect("host should start");
    HostFixture {
        listener,
        events,
        forwarded,
        endpoint,
    }
}

fn peer_for(endpoint: &Endpoint) -> (Peer, mpsc::UnboundedReceiver<SessionEvent>) {
    let directory = StaticDirectory::new()
        .with_paired(DeviceInfo::new("ramp-host", endpoint.address.clone()));
    let config = ClientConfig {
        channel: endpoint.channel,
    };
    Client::new(config, TcpConnector, directory)
}

async fn connect_peer(endpoint: &Endpoint) -> (Peer, mpsc::UnboundedReceiver<SessionEvent>) {
    let (mut client, events) = peer_for(endpoint);
    client.resolve("ramp-host").await.expect("host should be paired");
    client.start().await.expect("peer should connect");
    (client, events)
}

async fn wait_status(mut rx: watch::Receiver<SessionStatus>, want: SessionStatus) {
    tokio::time::timeout(WAIT, rx.wait_for(|s| *s == want))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {want}"))
        .expect("status sender dropped");
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn next_forwarded(rx: &mut mpsc::UnboundedReceiver<ActionCode>) -> String {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for forwarded code")
        .expect("actuator channel closed")
        .as_str()
        .to_owned()
}

/// A bare socket speaking the line protocol, for wire-level checks.
async fn raw_peer(endpoint: &Endpoint) -> BufReader<TcpStream> {
    let stream = TcpStream::connect((endpoint.address.as_str(), endpoint.channel))
        .await
        .expect("raw connect");
    BufReader::new(stream)
}

async fn read_line(reader: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    tokio::time::timeout(WAIT, reader.read_line(&mut line))
        .await
        .expect("timed out reading line")
        .expect("read failed");
    line.trim_end().to_owned()
}

fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

// =========================================================================
// Host start
// =========================================================================

#[tokio::test]
async fn test_start_reports_initializing_then_waiting() {
    let mut host = start_host(2).await;

    assert_eq!(host.listener.status(), SessionStatus::Waiting);
    assert_eq!(host.listener.capacity(), 1);
    assert_ne!(host.endpoint.channel, 0);
    assert_eq!(
        drain(&mut host.events),
        [
            SessionEvent::Status(SessionStatus::Initializing),
            SessionEvent::Status(SessionStatus::Waiting),
        ]
    );
    host.listener.stop().await;
}

#[tokio::test]
async fn test_start_without_local_adapter_is_error() {
    let (link, _forwarded) = ChannelActuator::new();
    let arbiter = spawn_arbiter(ArbiterConfig::default(), link);
    let (mut listener, mut events): (Host, _) =
        Listener::new(ListenerConfig::default(), StaticDirectory::new(), arbiter);

    let err = listener.start().await.unwrap_err();
    assert!(matches!(err, SessionError::NoLocalAdapter));
    assert_eq!(listener.status(), SessionStatus::Error);
    assert!(!listener.is_running());

    listener.stop().await;
    assert_eq!(listener.status(), SessionStatus::Disconnected);
    assert_eq!(
        drain(&mut events),
        [
            SessionEvent::Status(SessionStatus::Initializing),
            SessionEvent::Status(SessionStatus::Error),
            SessionEvent::Status(SessionStatus::Disconnected),
        ]
    );
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let mut host = start_host(2).await;
    let err = host.listener.start().await.unwrap_err();
    assert!(matches!(err, SessionError::AlreadyStarted));
    host.listener.stop().await;
}

// =========================================================================
// Admission
// =========================================================================

#[tokio::test]
async fn test_peer_handshake_connects_both_sides() {
    let mut host = start_host(2).await;
    drain(&mut host.events);

    let (mut client, mut client_events) = connect_peer(&host.endpoint).await;
    assert_eq!(client.status(), SessionStatus::Connected);
    assert!(client.is_connected());
    assert_eq!(
        drain(&mut client_events),
        [
            SessionEvent::Status(SessionStatus::Initializing),
            SessionEvent::Status(SessionStatus::Connected),
        ]
    );

    assert_eq!(
        next_event(&mut host.events).await,
        SessionEvent::PeerConnected(PeerId::Player(2))
    );
    assert_eq!(
        next_event(&mut host.events).await,
        SessionEvent::Status(SessionStatus::Connected)
    );
    assert_eq!(host.listener.peers().await, [PeerId::Player(2)]);

    client.stop().await;
    host.listener.stop().await;
}

#[tokio::test]
async fn test_peers_get_sequential_player_numbers() {
    let mut host = start_host(3).await;
    drain(&mut host.events);

    let (mut first, _) = connect_peer(&host.endpoint).await;
    assert_eq!(
        next_event(&mut host.events).await,
        SessionEvent::PeerConnected(PeerId::Player(2))
    );
    // One of two slots taken: still waiting, so no status change.
    assert_eq!(host.listener.status(), SessionStatus::Waiting);

    let (mut second, _) = connect_peer(&host.endpoint).await;
    assert_eq!(
        next_event(&mut host.events).await,
        SessionEvent::PeerConnected(PeerId::Player(3))
    );
    wait_status(host.listener.watch_status(), SessionStatus::Connected).await;
    assert_eq!(
        host.listener.peers().await,
        [PeerId::Player(2), PeerId::Player(3)]
    );

    first.stop().await;
    second.stop().await;
    host.listener.stop().await;
}

#[tokio::test]
async fn test_peer_over_capacity_is_rejected() {
    let mut host = start_host(2).await;
    let (mut admitted, _) = connect_peer(&host.endpoint).await;
    wait_status(host.listener.watch_status(), SessionStatus::Connected).await;

    let (mut extra, mut extra_events) = peer_for(&host.endpoint);
    extra.resolve("ramp-host").await.unwrap();
    let err = extra.start().await.unwrap_err();

    assert!(matches!(err, SessionError::CapacityExceeded));
    assert_eq!(extra.status(), SessionStatus::Error);
    assert!(!extra.is_connected());
    assert_eq!(
        drain(&mut extra_events),
        [
            SessionEvent::Status(SessionStatus::Initializing),
            SessionEvent::Status(SessionStatus::Error),
        ]
    );
    // The admitted peer is unaffected.
    assert_eq!(host.listener.peers().await, [PeerId::Player(2)]);
    assert!(admitted.is_connected());

    admitted.stop().await;
    host.listener.stop().await;
}

// =========================================================================
// Actions
// =========================================================================

#[tokio::test]
async fn test_peer_action_is_forwarded_through_arbiter() {
    let mut host = start_host(2).await;
    let (mut client, _) = connect_peer(&host.endpoint).await;

    client
        .send(&ActionCode::from_static(codes::ROTATE_RIGHT))
        .await
        .unwrap();
    assert_eq!(next_forwarded(&mut host.forwarded).await, "rs1");

    let mut snapshots = host.listener.arbiter().subscribe();
    tokio::time::timeout(
        WAIT,
        snapshots.wait_for(|s| s.state.owner() == Some(PeerId::Player(2))),
    )
    .await
    .expect("owner never published")
    .unwrap();

    client.stop().await;
    host.listener.stop().await;
}

#[tokio::test]
async fn test_peer_action_conflicting_with_local_owner_is_dropped() {
    let mut host = start_host(2).await;
    let arbiter: ArbiterHandle = host.listener.arbiter().clone();
    arbiter
        .submit(ActionRequest::hold_start(
            PeerId::Local,
            ActionCode::from_static(codes::ELEVATE_UP),
        ))
        .await
        .unwrap();
    assert_eq!(next_forwarded(&mut host.forwarded).await, "es0");

    let (mut client, _) = connect_peer(&host.endpoint).await;
    client
        .send(&ActionCode::from_static(codes::ROTATE_LEFT))
        .await
        .unwrap();
    // Round-trip through the arbiter so the peer's request has been seen.
    client.stop().await;
    wait_status(host.listener.watch_status(), SessionStatus::Disconnected).await;

    assert!(host.forwarded.try_recv().is_err());
    assert_eq!(arbiter.snapshot().state.owner(), Some(PeerId::Local));
    host.listener.stop().await;
}

#[tokio::test]
async fn test_peer_link_forwards_local_arbiter_output_to_host() {
    let mut host = start_host(2).await;
    let (mut client, _) = connect_peer(&host.endpoint).await;

    // The peer runs its own arbiter; what it accepts goes to the host.
    let local = spawn_arbiter(ArbiterConfig::default(), client.link());
    let verdict = local
        .submit(ActionRequest::toggle(
            PeerId::Local,
            ActionCode::from_static(codes::ROTATE_LEFT),
        ))
        .await
        .unwrap();
    assert!(verdict.is_forwarded());
    assert_eq!(next_forwarded(&mut host.forwarded).await, "rs0");

    client.stop().await;
    host.listener.stop().await;
}

#[tokio::test]
async fn test_send_before_start_is_not_connected() {
    let (client, _) = peer_for(&Endpoint::new("127.0.0.1", 1));
    let err = client
        .send(&ActionCode::from_static(codes::ROTATE_LEFT))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotConnected));
}

// =========================================================================
// Departure
// =========================================================================

#[tokio::test]
async fn test_peer_disconnect_releases_ownership() {
    let mut host = start_host(2).await;
    let (mut client, _) = connect_peer(&host.endpoint).await;
    client
        .send(&ActionCode::from_static(codes::ELEVATE_DOWN))
        .await
        .unwrap();
    assert_eq!(next_forwarded(&mut host.forwarded).await, "es1");
    drain(&mut host.events);

    client.stop().await;

    // The stop code goes out on the departed peer's behalf.
    assert_eq!(next_forwarded(&mut host.forwarded).await, "es1");
    assert_eq!(
        next_event(&mut host.events).await,
        SessionEvent::PeerDisconnected(PeerId::Player(2))
    );
    assert_eq!(
        next_event(&mut host.events).await,
        SessionEvent::Status(SessionStatus::Disconnected)
    );
    assert!(host.listener.peers().await.is_empty());
    assert!(host.listener.arbiter().snapshot().state.is_idle());
    host.listener.stop().await;
}

#[tokio::test]
async fn test_dropped_link_counts_as_disconnect() {
    let mut host = start_host(3).await;
    let mut raw = raw_peer(&host.endpoint).await;
    assert_eq!(read_line(&mut raw).await, "Connected");
    let (mut other, _) = connect_peer(&host.endpoint).await;
    wait_status(host.listener.watch_status(), SessionStatus::Connected).await;
    drain(&mut host.events);

    // No goodbye frame: the socket just goes away.
    drop(raw);

    assert_eq!(
        next_event(&mut host.events).await,
        SessionEvent::PeerDisconnected(PeerId::Player(2))
    );
    assert_eq!(
        next_event(&mut host.events).await,
        SessionEvent::Status(SessionStatus::Waiting)
    );
    assert_eq!(host.listener.peers().await, [PeerId::Player(3)]);
    assert!(other.is_connected());

    other.stop().await;
    host.listener.stop().await;
}

#[tokio::test]
async fn test_wire_frames_are_newline_terminated_literals() {
    let mut host = start_host(2).await;
    let mut first = raw_peer(&host.endpoint).await;
    assert_eq!(read_line(&mut first).await, "Connected");

    let mut second = raw_peer(&host.endpoint).await;
    assert_eq!(read_line(&mut second).await, "Max clients connected");

    first.get_mut().write_all(b"rs0\n").await.unwrap();
    assert_eq!(next_forwarded(&mut host.forwarded).await, "rs0");

    host.listener.stop().await;
    assert_eq!(read_line(&mut first).await, "Disconnect");
}

#[tokio::test]
async fn test_host_stop_disconnects_peers() {
    let mut host = start_host(2).await;
    let (mut client, mut client_events) = connect_peer(&host.endpoint).await;
    drain(&mut client_events);

    host.listener.stop().await;
    assert_eq!(host.listener.status(), SessionStatus::Disconnected);
    assert!(!host.listener.is_running());

    wait_status(client.watch_status(), SessionStatus::Disconnected).await;
    assert_eq!(
        next_event(&mut client_events).await,
        SessionEvent::Status(SessionStatus::Disconnected)
    );
    assert!(!client.is_connected());
    let err = client
        .send(&ActionCode::from_static(codes::ROTATE_LEFT))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotConnected));

    client.stop().await;
    assert!(drain(&mut client_events).is_empty());
}

#[tokio::test]
async fn test_host_restart_resets_numbering() {
    let mut host = start_host(2).await;
    let (mut client, _) = connect_peer(&host.endpoint).await;
    wait_status(host.listener.watch_status(), SessionStatus::Connected).await;
    host.listener.stop().await;
    wait_status(client.watch_status(), SessionStatus::Disconnected).await;

    let endpoint = host.listener.start().await.unwrap();
    drain(&mut host.events);
    let (mut again, _) = connect_peer(&endpoint).await;
    assert_eq!(
        next_event(&mut host.events).await,
        SessionEvent::PeerConnected(PeerId::Player(2))
    );

    again.stop().await;
    client.stop().await;
    host.listener.stop().await;
}

// =========================================================================
// Client lifecycle
// =========================================================================

#[tokio::test]
async fn test_client_stop_is_idempotent() {
    let mut host = start_host(2).await;
    let (mut client, mut events) = connect_peer(&host.endpoint).await;

    client.stop().await;
    client.stop().await;

    assert_eq!(client.status(), SessionStatus::Disconnected);
    assert_eq!(
        drain(&mut events),
        [
            SessionEvent::Status(SessionStatus::Initializing),
            SessionEvent::Status(SessionStatus::Connected),
            SessionEvent::Status(SessionStatus::Disconnected),
        ]
    );
    host.listener.stop().await;
}

#[tokio::test]
async fn test_client_can_reconnect_after_stop() {
    let mut host = start_host(2).await;
    let (mut client, _) = connect_peer(&host.endpoint).await;
    client.stop().await;
    wait_status(host.listener.watch_status(), SessionStatus::Disconnected).await;

    client.start().await.expect("second start should connect");
    assert!(client.is_connected());
    // Numbers are not reused within a host session.
    wait_status(host.listener.watch_status(), SessionStatus::Connected).await;
    assert_eq!(host.listener.peers().await, [PeerId::Player(3)]);

    client.stop().await;
    host.listener.stop().await;
}

#[tokio::test]
async fn test_resolve_unknown_device_fails() {
    let (mut client, _) = peer_for(&Endpoint::new("127.0.0.1", 1));
    let err = client.resolve("nope").await.unwrap_err();
    assert!(matches!(err, SessionError::UnknownDevice(name) if name == "nope"));
    assert!(client.target().is_none());
}

#[tokio::test]
async fn test_start_without_target_fails() {
    let (mut client, _): (Peer, _) =
        Client::new(ClientConfig::default(), TcpConnector, StaticDirectory::new());
    let err = client.start().await.unwrap_err();
    assert!(matches!(err, SessionError::NoTargetSelected));
    assert_eq!(client.status(), SessionStatus::Disconnected);
}

#[tokio::test]
async fn test_start_against_absent_host_is_error() {
    // Grab a free port, then release it so nothing is listening.
    let vacant = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = vacant.local_addr().unwrap().port();
    drop(vacant);

    let (mut client, _) = peer_for(&Endpoint::new("127.0.0.1", port));
    client.resolve("ramp-host").await.unwrap();
    let err = client.start().await.unwrap_err();
    assert!(matches!(err, SessionError::ConnectFailed(_)));
    assert_eq!(client.status(), SessionStatus::Error);
}

#[tokio::test]
async fn test_stop_after_failed_connect_is_disconnected() {
    let vacant = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = vacant.local_addr().unwrap().port();
    drop(vacant);

    let (mut client, mut events) = peer_for(&Endpoint::new("127.0.0.1", port));
    client.resolve("ramp-host").await.unwrap();
    client.start().await.unwrap_err();
    client.stop().await;
    client.stop().await;

    assert_eq!(client.status(), SessionStatus::Disconnected);
    assert_eq!(
        drain(&mut events),
        [
            SessionEvent::Status(SessionStatus::Initializing),
            SessionEvent::Status(SessionStatus::Error),
            SessionEvent::Status(SessionStatus::Disconnected),
        ]
    );
}

#[tokio::test]
async fn test_stop_after_capacity_rejection_is_disconnected() {
    let mut host = start_host(2).await;
    let (mut admitted, _) = connect_peer(&host.endpoint).await;
    wait_status(host.listener.watch_status(), SessionStatus::Connected).await;

    let (mut extra, _) = peer_for(&host.endpoint);
    extra.resolve("ramp-host").await.unwrap();
    assert!(matches!(
        extra.start().await,
        Err(SessionError::CapacityExceeded)
    ));
    assert_eq!(extra.status(), SessionStatus::Error);

    extra.stop().await;
    assert_eq!(extra.status(), SessionStatus::Disconnected);
    // The rejected peer's stop leaves the admitted one alone.
    assert!(admitted.is_connected());
    assert_eq!(host.listener.peers().await, [PeerId::Player(2)]);

    admitted.stop().await;
    host.listener.stop().await;
}

#[tokio::test]
async fn test_list_paired_devices() {
    let (client, _) = peer_for(&Endpoint::new("127.0.0.1", 9));
    let devices = client.list_paired_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "ramp-host");
}
