//! Action codes: the command strings the ramp actuator understands.
//!
//! Codes are opaque to the transport, but the arbiter needs to know three
//! things about each one: whether it is a paired sweep (started and later
//! stopped), whether it drops the ball (and so locks the ramp out for a
//! while), and whether it is a one-shot calibration routine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// The known action vocabulary.
pub mod codes {
    /// Rotate the ramp left.
    pub const ROTATE_LEFT: &str = "rs0";
    /// Rotate the ramp right.
    pub const ROTATE_RIGHT: &str = "rs1";
    /// Raise the ramp.
    pub const ELEVATE_UP: &str = "es0";
    /// Lower the ramp.
    pub const ELEVATE_DOWN: &str = "es1";
    /// Release the ball.
    pub const DROP: &str = "dd-70";

    /// Drop, then calibrate rotation and elevation.
    pub const CALIBRATE_FULL: &str = "dd-70>rc>ec";
    /// Calibrate rotation.
    pub const CALIBRATE_ROTATION: &str = "rc0";
    /// Calibrate elevation, manual mode.
    pub const CALIBRATE_ELEVATION_MANUAL: &str = "ec0";
    /// Calibrate elevation, automatic mode.
    pub const CALIBRATE_ELEVATION_AUTO: &str = "ec1";

    /// Any code containing this fragment actuates the drop mechanism.
    pub const DROP_FRAGMENT: &str = "dd-";
    /// Separates the steps of a chained calibration sequence.
    pub const SEQUENCE_SEPARATOR: char = '>';
}

/// How the arbiter treats a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionClass {
    /// A continuous motion that runs until the same code is sent again.
    Sweep,
    /// The ball drop. Unpaired; triggers the lockout.
    Drop,
    /// A self-terminating calibration routine.
    Calibration,
}

/// An opaque actuator command such as `rs1` or `dd-70`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionCode(String);

impl ActionCode {
    /// Wraps a code, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Rejects empty codes and codes containing line breaks, which could
    /// not survive framing.
    pub fn new(code: impl Into<String>) -> Result<Self, ProtocolError> {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }
        if trimmed.contains(['\n', '\r']) {
            return Err(ProtocolError::InvalidMessage(format!(
                "action code {trimmed:?} contains a line break"
            )));
        }
        if trimmed.len() == code.len() {
            Ok(Self(code))
        } else {
            Ok(Self(trimmed.to_owned()))
        }
    }

    /// Wraps one of the [`codes`] constants.
    pub fn from_static(code: &'static str) -> Self {
        Self(code.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn class(&self) -> ActionClass {
        let code = self.0.as_str();
        let chained = code.contains(codes::SEQUENCE_SEPARATOR);
        if code.contains(codes::DROP_FRAGMENT) && !chained {
            ActionClass::Drop
        } else if chained || code.starts_with("rc") || code.starts_with("ec")
        {
            ActionClass::Calibration
        } else {
            ActionClass::Sweep
        }
    }

    /// Whether forwarding this code starts the post-drop lockout.
    ///
    /// True for the drop itself and for any chained calibration that
    /// includes a drop step.
    pub fn locks_out(&self) -> bool {
        self.0.contains(codes::DROP_FRAGMENT)
    }

    /// The code that ends this action, if it is a paired sweep.
    ///
    /// The actuator firmware toggles a sweep off when it receives the same
    /// code a second time, so the stop value is the code itself.
    pub fn stop_code(&self) -> Option<ActionCode> {
        match self.class() {
            ActionClass::Sweep => Some(self.clone()),
            ActionClass::Drop | ActionClass::Calibration => None,
        }
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ActionCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
