//! # usbvol-core
//!
//! Shared library for usbvol containing the volume state machine, the knob
//! key model and the HQPlayer control-protocol codec.
//!
//! It has zero dependencies on OS APIs, input devices, or network sockets,
//! so everything here can be unit-tested on any platform.
//!
//! # Architecture overview (for beginners)
//!
//! usbvol turns a USB volume knob into a remote control for HQPlayer
//! Embedded.  The knob produces three kinds of key presses (volume up,
//! volume down, mute); the daemon turns those into `Volume` commands on the
//! player's TCP control connection, and listens to what the player reports
//! back so the local idea of "current volume" never drifts from reality.
//!
//! This crate (`usbvol-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – The volume state machine.  Given a key press or a
//!   report from the player, it decides what the new local state is and
//!   whether a command must be sent.
//!
//! - **`keymap`** – The three knob keys and their translation from Linux
//!   input-event key codes.
//!
//! - **`protocol`** – How requests and responses travel over the control
//!   connection: one XML document per line.

pub mod domain;
pub mod keymap;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `usbvol_core::VolumeState` instead of `usbvol_core::domain::volume::VolumeState`.
pub use domain::volume::{MuteState, Transition, TransitionKind, VolumeSettings, VolumeState};
pub use keymap::KnobKey;
pub use protocol::codec::{decode_response, encode_request, ProtocolError};
pub use protocol::messages::{ControlRequest, ControlResponse, PlaybackState, VolumeRange};
