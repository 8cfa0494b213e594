//! Infrastructure layer for the daemon.
//!
//! Contains OS-facing adapters: input devices, the network session to
//! HQPlayer, and configuration file storage.
//!
//! # Sub-modules
//!
//! - **`input_device`** – Locating the knob and draining its key presses.
//!   The evdev implementation is compiled on Linux only; mock
//!   implementations are always available for tests.
//!
//! - **`remote`** – TCP client for the HQPlayer control interface.  Runs as
//!   a background task so the controller never waits on the network.
//!
//! - **`storage`** – Reading `/etc/default/usbvol`.

pub mod input_device;
pub mod remote;
pub mod storage;
