//! The arbitration state machine.
//!
//! Everything in this module is a pure function of
//! `(state, request, now)`. No clocks are read and nothing is sent; the
//! actor in [`arbiter`](crate::arbiter) owns the state, supplies `now`,
//! and forwards whatever the verdict says.

use std::fmt;
use std::time::Duration;

use rampctl_protocol::{ActionClass, ActionCode, PeerId};
use serde::Serialize;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Requests and verdicts
// ---------------------------------------------------------------------------

/// How an originator engages an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// A control was pressed and is being held.
    HoldStart,
    /// The held control was released.
    HoldStop,
    /// A one-press control: first press starts, second press stops.
    Toggle,
}

/// One request to move the ramp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRequest {
    pub originator: PeerId,
    pub code: ActionCode,
    pub kind: ActionKind,
}

impl ActionRequest {
    pub fn new(originator: PeerId, code: ActionCode, kind: ActionKind) -> Self {
        Self {
            originator,
            code,
            kind,
        }
    }

    pub fn toggle(originator: PeerId, code: ActionCode) -> Self {
        Self::new(originator, code, ActionKind::Toggle)
    }

    pub fn hold_start(originator: PeerId, code: ActionCode) -> Self {
        Self::new(originator, code, ActionKind::HoldStart)
    }

    pub fn hold_stop(originator: PeerId, code: ActionCode) -> Self {
        Self::new(originator, code, ActionKind::HoldStop)
    }
}

/// Why a request was not forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum Rejection {
    /// A drop happened recently; every control is disabled until the
    /// lockout deadline passes.
    LockoutActive { remaining: Duration },
    /// Someone else owns the ramp, or the owner asked for a different code.
    OwnershipConflict { owner: PeerId, active: ActionCode },
    /// A hold release that does not match the hold in progress.
    NoMatchingHold,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockoutActive { remaining } => {
                write!(f, "locked out for another {:.1}s", remaining.as_secs_f64())
            }
            Self::OwnershipConflict { owner, active } => {
                write!(f, "{owner} is running {active}")
            }
            Self::NoMatchingHold => f.write_str("no matching hold"),
        }
    }
}

/// The outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// This code was (or is about to be) sent to the actuator.
    Forwarded(ActionCode),
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, Self::Forwarded(_))
    }

    /// The code to send to the actuator, if any.
    pub fn forwarded(&self) -> Option<&ActionCode> {
        match self {
            Self::Forwarded(code) => Some(code),
            Self::Rejected(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ArbiterState
// ---------------------------------------------------------------------------

/// How the current owner engaged the active action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Engagement {
    Hold,
    Toggle,
}

/// Who, if anyone, is driving the ramp.
///
/// ```text
///            start (sweep)                    drop
///   Idle ─────────────────→ Busy ─┐   Idle ──────────→ Locked(until)
///    ↑                            │                         │
///    └──── stop by owner ─────────┘    └──── now ≥ until ───┘
/// ```
///
/// The owner and active code live inside `Busy`, so "has an owner" and
/// "has an active code" can never disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ArbiterState {
    #[default]
    Idle,
    Busy {
        owner: PeerId,
        code: ActionCode,
        engagement: Engagement,
    },
    Locked {
        #[serde(skip)]
        until: Instant,
    },
}

impl ArbiterState {
    pub fn owner(&self) -> Option<PeerId> {
        match self {
            Self::Busy { owner, .. } => Some(*owner),
            _ => None,
        }
    }

    pub fn active_code(&self) -> Option<&ActionCode> {
        match self {
            Self::Busy { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn lockout_deadline(&self) -> Option<Instant> {
        match self {
            Self::Locked { until } => Some(*until),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Clears an elapsed lockout. Returns `true` if the state changed.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self {
            Self::Locked { until } if now >= *until => {
                *self = Self::Idle;
                true
            }
            _ => false,
        }
    }

    /// Evaluates one request, updating the state in place.
    ///
    /// An elapsed lockout is cleared first, so the request that arrives
    /// after the deadline is evaluated against `Idle`.
    pub fn apply(
        &mut self,
        request: &ActionRequest,
        now: Instant,
        lockout: Duration,
    ) -> Verdict {
        self.expire(now);

        if let Self::Locked { until } = self {
            return Verdict::Rejected(Rejection::LockoutActive {
                remaining: until.saturating_duration_since(now),
            });
        }

        match request.kind {
            ActionKind::HoldStart => self.start(request, Engagement::Hold, now, lockout),
            ActionKind::HoldStop => self.stop_hold(request),
            ActionKind::Toggle if self.is_idle() => {
                self.start(request, Engagement::Toggle, now, lockout)
            }
            ActionKind::Toggle if self.is_owned_by(request, None) => self.finish(),
            ActionKind::Toggle => self.conflict(),
        }
    }

    /// Ends whatever `peer` owns, as if it had sent the stop itself.
    ///
    /// Returns the stop code to forward, or `None` if `peer` owns nothing.
    pub fn release(&mut self, peer: PeerId) -> Option<ActionCode> {
        if self.owner() != Some(peer) {
            return None;
        }
        self.finish().forwarded().cloned()
    }

    fn start(
        &mut self,
        request: &ActionRequest,
        engagement: Engagement,
        now: Instant,
        lockout: Duration,
    ) -> Verdict {
        if !self.is_idle() {
            return self.conflict();
        }
        let code = request.code.clone();
        if code.locks_out() {
            *self = Self::Locked {
                until: now + lockout,
            };
        } else if code.class() == ActionClass::Sweep {
            *self = Self::Busy {
                owner: request.originator,
                code: code.clone(),
                engagement,
            };
        }
        // Other calibration routines finish on their own; stay Idle.
        Verdict::Forwarded(code)
    }

    fn stop_hold(&mut self, request: &ActionRequest) -> Verdict {
        if self.is_owned_by(request, Some(Engagement::Hold)) {
            self.finish()
        } else {
            Verdict::Rejected(Rejection::NoMatchingHold)
        }
    }

    /// Whether `request` names the running action and comes from its owner.
    fn is_owned_by(
        &self,
        request: &ActionRequest,
        via: Option<Engagement>,
    ) -> bool {
        match self {
            Self::Busy {
                owner,
                code,
                engagement,
            } => {
                *owner == request.originator
                    && *code == request.code
                    && via.is_none_or(|e| e == *engagement)
            }
            _ => false,
        }
    }

    fn finish(&mut self) -> Verdict {
        let state = std::mem::take(self);
        match state {
            Self::Busy { code, .. } => {
                let stop = code.stop_code().unwrap_or(code);
                Verdict::Forwarded(stop)
            }
            other => {
                *self = other;
                Verdict::Rejected(Rejection::NoMatchingHold)
            }
        }
    }

    fn conflict(&self) -> Verdict {
        match self {
            Self::Busy { owner, code, .. } => {
                Verdict::Rejected(Rejection::OwnershipConflict {
                    owner: *owner,
                    active: code.clone(),
                })
            }
            Self::Locked { .. } | Self::Idle => {
                Verdict::Rejected(Rejection::NoMatchingHold)
            }
        }
    }
}
