//! Knob key model and translation from Linux input-event codes.
//!
//! A volume knob reports through the kernel input subsystem exactly like a
//! multimedia keyboard: turning it clockwise emits `KEY_VOLUMEUP`,
//! counter-clockwise emits `KEY_VOLUMEDOWN`, and pressing it emits
//! `KEY_MUTE`.  Each physical action produces a *press* event (value 1)
//! followed by a *release* (value 0); holding the knob down may produce
//! auto-repeat events (value 2).
//!
//! Only the transition to "pressed" carries meaning for volume control, so
//! [`KnobKey::from_raw_event`] filters everything else out.

/// `EV_KEY` event type from `linux/input-event-codes.h`.
pub const EV_KEY: u16 = 0x01;

/// `KEY_MUTE` from `linux/input-event-codes.h`.
pub const KEY_MUTE: u16 = 113;
/// `KEY_VOLUMEDOWN` from `linux/input-event-codes.h`.
pub const KEY_VOLUMEDOWN: u16 = 114;
/// `KEY_VOLUMEUP` from `linux/input-event-codes.h`.
pub const KEY_VOLUMEUP: u16 = 115;

/// Event value the kernel uses for a key press.
pub const KEY_PRESSED: i32 = 1;

/// The key codes a device must advertise to be accepted as a volume knob.
pub const REQUIRED_KEY_CODES: [u16; 3] = [KEY_VOLUMEUP, KEY_VOLUMEDOWN, KEY_MUTE];

/// One discrete knob action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnobKey {
    /// Knob turned one detent clockwise.
    VolumeUp,
    /// Knob turned one detent counter-clockwise.
    VolumeDown,
    /// Knob pressed; toggles mute.
    Mute,
}

impl KnobKey {
    /// Maps a Linux key code to a knob key.
    ///
    /// Returns `None` for any code the knob does not use.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            KEY_VOLUMEUP => Some(KnobKey::VolumeUp),
            KEY_VOLUMEDOWN => Some(KnobKey::VolumeDown),
            KEY_MUTE => Some(KnobKey::Mute),
            _ => None,
        }
    }

    /// Returns the Linux key code for this knob key.
    pub fn code(self) -> u16 {
        match self {
            KnobKey::VolumeUp => KEY_VOLUMEUP,
            KnobKey::VolumeDown => KEY_VOLUMEDOWN,
            KnobKey::Mute => KEY_MUTE,
        }
    }

    /// Decodes a raw `(type, code, value)` input event into a knob press.
    ///
    /// Returns `Some` only for `EV_KEY` press events of one of the three
    /// knob keys.  Releases, auto-repeats, sync reports and unrelated keys
    /// all yield `None`.
    pub fn from_raw_event(event_type: u16, code: u16, value: i32) -> Option<Self> {
        if event_type != EV_KEY || value != KEY_PRESSED {
            return None;
        }
        Self::from_code(code)
    }
}

/// Returns `true` when `codes` contains every key in [`REQUIRED_KEY_CODES`].
pub fn has_required_keys(codes: &[u16]) -> bool {
    REQUIRED_KEY_CODES.iter().all(|required| codes.contains(required))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
