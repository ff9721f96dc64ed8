//! Keyboard bindings and calibration presets for the local controls.
//!
//! A [`KeyMap`] turns raw key events into [`ActionRequest`]s. Hold keys
//! start an action on press and stop it on release; toggle keys send one
//! request per press. Auto-repeat events never produce a request, and a
//! release only counts for the hold key that was pressed last.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rampctl_arbiter::ActionRequest;
use rampctl_protocol::{codes, ActionCode, PeerId};

use crate::RampctlError;

// ---------------------------------------------------------------------------
// Key events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEdge {
    Press,
    Release,
}

/// One key event from the input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: char,
    pub edge: KeyEdge,
    /// Set for events the OS synthesizes while a key stays down.
    pub auto_repeat: bool,
}

impl KeyInput {
    pub fn press(key: char) -> Self {
        Self {
            key,
            edge: KeyEdge::Press,
            auto_repeat: false,
        }
    }

    pub fn release(key: char) -> Self {
        Self {
            key,
            edge: KeyEdge::Release,
            auto_repeat: false,
        }
    }

    /// An auto-repeated press.
    pub fn repeat(key: char) -> Self {
        Self {
            auto_repeat: true,
            ..Self::press(key)
        }
    }
}

// ---------------------------------------------------------------------------
// KeyMap
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Press starts, release stops.
    Hold(ActionCode),
    /// Each press is a toggle request.
    Toggle(ActionCode),
}

#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    bindings: HashMap<char, Binding>,
    held: Option<char>,
}

impl KeyMap {
    /// The standard layout.
    ///
    /// | key | binding |
    /// |---|---|
    /// | `A` / `D` | hold rotate left / right |
    /// | `W` / `S` | hold elevate up / down |
    /// | `1` | toggle elevate down |
    /// | `2` | toggle rotate left |
    /// | `3`, `R` | drop |
    pub fn standard() -> Self {
        Self::default()
            .bind_hold('A', ActionCode::from_static(codes::ROTATE_LEFT))
            .bind_hold('D', ActionCode::from_static(codes::ROTATE_RIGHT))
            .bind_hold('W', ActionCode::from_static(codes::ELEVATE_UP))
            .bind_hold('S', ActionCode::from_static(codes::ELEVATE_DOWN))
            .bind_toggle('1', ActionCode::from_static(codes::ELEVATE_DOWN))
            .bind_toggle('2', ActionCode::from_static(codes::ROTATE_LEFT))
            .bind_toggle('3', ActionCode::from_static(codes::DROP))
            .bind_toggle('R', ActionCode::from_static(codes::DROP))
    }

    pub fn bind_hold(mut self, key: char, code: ActionCode) -> Self {
        self.bindings.insert(normalize(key), Binding::Hold(code));
        self
    }

    pub fn bind_toggle(mut self, key: char, code: ActionCode) -> Self {
        self.bindings.insert(normalize(key), Binding::Toggle(code));
        self
    }

    /// Keys are case-insensitive.
    pub fn binding(&self, key: char) -> Option<&Binding> {
        self.bindings.get(&normalize(key))
    }

    /// The hold key currently down, if any.
    pub fn held(&self) -> Option<char> {
        self.held
    }

    /// Translates one key event into a request for `originator`.
    pub fn translate(&mut self, originator: PeerId, input: KeyInput) -> Option<ActionRequest> {
        if input.auto_repeat {
            return None;
        }
        let key = normalize(input.key);
        let binding = self.bindings.get(&key)?;

        match (input.edge, binding) {
            (KeyEdge::Press, Binding::Hold(code)) => {
                let request = ActionRequest::hold_start(originator, code.clone());
                self.held = Some(key);
                Some(request)
            }
            (KeyEdge::Press, Binding::Toggle(code)) => {
                Some(ActionRequest::toggle(originator, code.clone()))
            }
            (KeyEdge::Release, Binding::Hold(code)) if self.held == Some(key) => {
                let request = ActionRequest::hold_stop(originator, code.clone());
                self.held = None;
                Some(request)
            }
            (KeyEdge::Release, _) => None,
        }
    }

    /// Releases the held key, e.g. when the window loses focus.
    pub fn release_held(&mut self, originator: PeerId) -> Option<ActionRequest> {
        let key = self.held?;
        self.translate(originator, KeyInput::release(key))
    }
}

fn normalize(key: char) -> char {
    key.to_ascii_uppercase()
}

// ---------------------------------------------------------------------------
// Calibration presets
// ---------------------------------------------------------------------------

/// The calibration routines offered to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibrationPreset {
    /// Drop, then calibrate rotation and elevation. Locks out like a drop.
    Full,
    Drop,
    Rotation,
    ElevationManual,
    ElevationAutomatic,
}

impl CalibrationPreset {
    pub const ALL: [Self; 5] = [
        Self::Full,
        Self::Drop,
        Self::Rotation,
        Self::ElevationManual,
        Self::ElevationAutomatic,
    ];

    pub fn code(self) -> ActionCode {
        ActionCode::from_static(match self {
            Self::Full => codes::CALIBRATE_FULL,
            Self::Drop => codes::DROP,
            Self::Rotation => codes::CALIBRATE_ROTATION,
            Self::ElevationManual => codes::CALIBRATE_ELEVATION_MANUAL,
            Self::ElevationAutomatic => codes::CALIBRATE_ELEVATION_AUTO,
        })
    }

    /// Calibrations are one-shot, sent as toggles.
    pub fn request(self, originator: PeerId) -> ActionRequest {
        ActionRequest::toggle(originator, self.code())
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Drop => "drop",
            Self::Rotation => "rotation",
            Self::ElevationManual => "elevation-manual",
            Self::ElevationAutomatic => "elevation-automatic",
        }
    }
}

impl fmt::Display for CalibrationPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CalibrationPreset {
    type Err = RampctlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.label() == wanted)
            .ok_or_else(|| RampctlError::UnknownPreset(s.to_owned()))
    }
}
