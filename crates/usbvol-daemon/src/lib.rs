//! usbvol-daemon library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does usbvold do? (for beginners)
//!
//! `usbvold` is a small background service for a headless music player.
//! A USB volume knob is plugged into the machine; HQPlayer Embedded runs
//! locally (or on the LAN) and exposes a TCP control port.  The daemon:
//!
//! 1. Finds the knob among `/dev/input/event*` by vendor/product id and
//!    checks that it really reports volume-up, volume-down and mute keys.
//! 2. Connects to HQPlayer's control port and asks for the volume range and
//!    the current volume, so local state starts in sync with the player.
//! 3. Polls the knob every 10 ms and turns each key press into a `Volume`
//!    command, clamped to the range and honouring mute.
//! 4. Keeps listening to the player: if it reports a new range or volume
//!    (for example because a phone app changed it), local state follows.
//! 5. Reconnects on its own whenever the player restarts or the connection
//!    drops.

/// Application layer: the volume controller use case and the event loop.
pub mod application;

/// Infrastructure layer: input devices, the HQPlayer session, config storage.
pub mod infrastructure;
