//! Application layer use cases for the daemon.
//!
//! - **`control_volume`** – The volume controller.  Owns the local
//!   [`usbvol_core::VolumeState`], applies knob presses and player reports
//!   to it, and issues commands through the [`control_volume::RemoteSession`]
//!   trait.  The HQPlayer TCP implementation of that trait is injected at
//!   construction time.
//!
//! - **`event_loop`** – The single-threaded dispatch loop that feeds the
//!   controller from the device poll timer, the session notification
//!   channel, and the reconnect timer.

pub mod control_volume;
pub mod event_loop;
