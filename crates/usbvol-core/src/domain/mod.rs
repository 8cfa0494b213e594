//! Domain entities for usbvol.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies.  Code in outer layers (the daemon's application and
//! infrastructure layers) depends on the domain, but the domain never
//! depends on them, which keeps the volume rules testable in isolation.

/// The volume state machine, the core domain concept.
///
/// See [`volume::VolumeState`] for the main type.
pub mod volume;
