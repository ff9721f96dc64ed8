//! Arbiter actor: an isolated Tokio task that owns the [`ArbiterState`].
//!
//! Every producer (local controls, each peer reader) holds a cloned
//! [`ArbiterHandle`] and sends commands through one bounded mpsc channel.
//! The actor handles them one at a time, so two requests can never race
//! on the state, and forwards accepted codes to its [`ActuatorLink`].
//!
//! The lockout deadline is also watched by the actor itself: a
//! `sleep_until` branch in its `select!` loop returns the state to `Idle`
//! the moment the deadline passes, even if nobody sends a request. That
//! is what lets a UI re-enable its controls on time.

use std::time::Duration;

use rampctl_protocol::{ActionCode, PeerId};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};

use crate::{
    ActionRequest, ActuatorLink, ArbiterConfig, ArbiterError, ArbiterState,
    Verdict,
};

/// A published view of the arbiter, for UIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArbiterSnapshot {
    pub state: ArbiterState,
    /// `false` while a lockout is active.
    pub controls_enabled: bool,
}

impl ArbiterSnapshot {
    fn of(state: &ArbiterState) -> Self {
        Self {
            state: state.clone(),
            controls_enabled: state.lockout_deadline().is_none(),
        }
    }
}

/// Commands sent to the arbiter actor through its channel.
enum ArbiterCommand {
    /// Evaluate a request. `reply` is `None` for fire-and-forget submits.
    Submit {
        request: ActionRequest,
        reply: Option<oneshot::Sender<Verdict>>,
    },

    /// End whatever `peer` owns (it disconnected).
    Release {
        peer: PeerId,
        reply: oneshot::Sender<Option<ActionCode>>,
    },

    /// Return to `Idle` without forwarding anything.
    Reset,

    /// Stop the actor.
    Shutdown,
}

/// Handle to a running arbiter. Cheap to clone.
#[derive(Clone)]
pub struct ArbiterHandle {
    sender: mpsc::Sender<ArbiterCommand>,
    snapshots: watch::Receiver<ArbiterSnapshot>,
}

impl ArbiterHandle {
    /// Submits a request and waits for the verdict.
    ///
    /// When the verdict is `Forwarded`, the code has already been handed
    /// to the actuator link by the time this returns.
    pub async fn submit(
        &self,
        request: ActionRequest,
    ) -> Result<Verdict, ArbiterError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(ArbiterCommand::Submit {
                request,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| ArbiterError::Unavailable)?;
        reply_rx.await.map_err(|_| ArbiterError::Unavailable)
    }

    /// Submits a request without waiting for the verdict.
    pub async fn submit_nowait(
        &self,
        request: ActionRequest,
    ) -> Result<(), ArbiterError> {
        self.sender
            .send(ArbiterCommand::Submit {
                request,
                reply: None,
            })
            .await
            .map_err(|_| ArbiterError::Unavailable)
    }

    /// Releases any action `peer` owns, forwarding its stop code.
    ///
    /// Returns the forwarded stop code, or `None` if `peer` owned nothing.
    pub async fn release(
        &self,
        peer: PeerId,
    ) -> Result<Option<ActionCode>, ArbiterError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(ArbiterCommand::Release {
                peer,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ArbiterError::Unavailable)?;
        reply_rx.await.map_err(|_| ArbiterError::Unavailable)
    }

    /// Forces the state back to `Idle`, discarding ownership and lockout.
    pub async fn reset(&self) -> Result<(), ArbiterError> {
        self.sender
            .send(ArbiterCommand::Reset)
            .await
            .map_err(|_| ArbiterError::Unavailable)
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> ArbiterSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ArbiterSnapshot> {
        self.snapshots.clone()
    }

    /// Tells the arbiter to stop.
    pub async fn shutdown(&self) -> Result<(), ArbiterError> {
        self.sender
            .send(ArbiterCommand::Shutdown)
            .await
            .map_err(|_| ArbiterError::Unavailable)
    }
}

/// The internal arbiter state. Runs inside a Tokio task.
struct ArbiterActor<L: ActuatorLink> {
    state: ArbiterState,
    lockout: Duration,
    link: L,
    receiver: mpsc::Receiver<ArbiterCommand>,
    snapshots: watch::Sender<ArbiterSnapshot>,
}

impl<L: ActuatorLink> ArbiterActor<L> {
    /// Runs the actor loop until shutdown or until every handle is dropped.
    async fn run(mut self) {
        tracing::info!(lockout_ms = self.lockout.as_millis() as u64, "arbiter started");

        loop {
            let deadline = self.state.lockout_deadline();
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd).await {
                        break;
                    }
                }
                _ = sleep_until_opt(deadline) => {
                    if self.state.expire(Instant::now()) {
                        tracing::info!("lockout elapsed, controls re-enabled");
                        self.publish();
                    }
                }
            }
        }

        tracing::info!("arbiter stopped");
    }

    /// Handles one command. Returns `false` when the actor should stop.
    async fn handle(&mut self, cmd: ArbiterCommand) -> bool {
        match cmd {
            ArbiterCommand::Submit { request, reply } => {
                let verdict = self.handle_submit(&request).await;
                if let Some(reply) = reply {
                    let _ = reply.send(verdict);
                }
            }
            ArbiterCommand::Release { peer, reply } => {
                let stop = self.state.release(peer);
                if let Some(code) = &stop {
                    tracing::info!(%peer, %code, "released ownership of departed peer");
                    self.forward(code).await;
                    self.publish();
                }
                let _ = reply.send(stop);
            }
            ArbiterCommand::Reset => {
                self.state = ArbiterState::Idle;
                tracing::debug!("arbiter reset");
                self.publish();
            }
            ArbiterCommand::Shutdown => {
                tracing::info!("arbiter shutting down");
                return false;
            }
        }
        true
    }

    async fn handle_submit(&mut self, request: &ActionRequest) -> Verdict {
        let before = self.state.clone();
        let verdict = self.state.apply(request, Instant::now(), self.lockout);

        match &verdict {
            Verdict::Forwarded(code) => {
                tracing::debug!(
                    originator = %request.originator,
                    kind = ?request.kind,
                    %code,
                    "forwarding action"
                );
                self.forward(code).await;
            }
            Verdict::Rejected(reason) => {
                tracing::debug!(
                    originator = %request.originator,
                    code = %request.code,
                    %reason,
                    "action rejected"
                );
            }
        }

        if self.state != before {
            if let Some(until) = self.state.lockout_deadline() {
                let secs = until.saturating_duration_since(Instant::now()).as_secs_f64();
                tracing::info!(lockout_secs = secs, "drop forwarded, controls locked");
            }
            self.publish();
        }
        verdict
    }

    /// Hands a code to the actuator. Failures are logged; the state change
    /// that produced the code stands.
    async fn forward(&self, code: &ActionCode) {
        if let Err(e) = self.link.send(code).await {
            tracing::error!(%code, error = %e, "actuator link failed");
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(ArbiterSnapshot::of(&self.state));
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Spawns a new arbiter task and returns a handle to communicate with it.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_arbiter<L: ActuatorLink>(
    config: ArbiterConfig,
    link: L,
) -> ArbiterHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let initial = ArbiterState::Idle;
    let (snap_tx, snap_rx) = watch::channel(ArbiterSnapshot::of(&initial));

    let actor = ArbiterActor {
        state: initial,
        lockout: config.lockout(),
        link,
        receiver: rx,
        snapshots: snap_tx,
    };

    tokio::spawn(actor.run());

    ArbiterHandle {
        sender: tx,
        snapshots: snap_rx,
    }
}
