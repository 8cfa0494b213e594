//! Control-protocol message types.
//!
//! HQPlayer Embedded exposes a TCP control interface (port 4321 by default)
//! where every request and every response is a small XML document on its
//! own line.  usbvol only needs a tiny slice of that interface:
//!
//! | Request        | Response                                   |
//! |----------------|--------------------------------------------|
//! | `VolumeRange`  | `<VolumeRange min=".." max=".." .../>`     |
//! | `State`        | `<State ... volume=".." .../>`             |
//! | `Volume value` | `<Volume result="OK"/>` (ignored)          |
//!
//! Everything else the player sends is decoded as
//! [`ControlResponse::Other`] and ignored by the daemon.

/// A request sent from usbvol to the player.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlRequest {
    /// Ask for the allowed volume range.
    VolumeRange,
    /// Ask for the full playback state (which includes the volume).
    State,
    /// Set the volume to the given level in dB.
    Volume(f64),
}

/// Volume range reported by the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeRange {
    pub min: f64,
    pub max: f64,
    /// Whether volume control is enabled on the player.
    pub enabled: bool,
    /// Whether the player runs adaptive volume.
    pub adaptive: bool,
}

/// Full playback state reported by the player.
///
/// Only `volume` is interpreted.  The remaining attributes (filter, shaper,
/// rate, matrix profile, ...) belong to the player's own configuration
/// surface and are kept verbatim, in document order, for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub volume: f64,
    pub attributes: Vec<(String, String)>,
}

impl PlaybackState {
    /// Looks up one of the uninterpreted attributes by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A response or notification received from the player.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlResponse {
    VolumeRange(VolumeRange),
    State(PlaybackState),
    /// Any other document; carries the root element name.
    Other(String),
}
