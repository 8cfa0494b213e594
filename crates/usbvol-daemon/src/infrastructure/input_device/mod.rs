//! Input device infrastructure: finding the knob and reading its presses.
//!
//! # How is the knob found?
//!
//! Every input device on Linux appears as `/dev/input/eventN`.  The locator
//! walks those nodes in lexicographic order and accepts the first one that
//!
//! 1. can be opened,
//! 2. reports the configured USB vendor and product id, and
//! 3. advertises all three knob keys (volume up, volume down, mute).
//!
//! Anything else is skipped with a log line.  Only when nothing qualifies is
//! the scan a failure ([`DeviceError::NotFound`]), which is fatal for the
//! daemon: without the knob there is nothing to do.
//!
//! # Testability
//!
//! Scanning goes through the [`DeviceProbe`] trait and reading through the
//! [`KeySource`] trait, so the matching rules and the event loop can be
//! tested with the implementations in [`mock`] on any platform.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use usbvol_core::keymap::has_required_keys;
use usbvol_core::KnobKey;

pub mod mock;

#[cfg(target_os = "linux")]
pub mod linux;

/// USB identity of the knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Error type for input device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No device matched the identity and capability requirements.
    #[error("no volume knob found with id {identity} supporting volume up/down and mute")]
    NotFound { identity: DeviceIdentity },

    /// The device directory could not be listed.
    #[error("failed to list input devices in {}: {source}", dir.display())]
    ScanFailed {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The device node could not be opened.
    #[error("failed to open input device {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The device opened but could not be prepared for polling.
    #[error("failed to initialise input device {}: {reason}", path.display())]
    InitFailed { path: PathBuf, reason: String },

    /// Reading pending events failed for a reason other than "no data".
    #[error("error reading input events: {0}")]
    ReadFailure(#[source] io::Error),

    /// Input devices are only supported on Linux.
    #[error("input devices are not supported on this platform")]
    UnsupportedPlatform,
}

/// What a probe learned about one candidate device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedDevice {
    pub name: String,
    pub identity: DeviceIdentity,
    /// Every `EV_KEY` code the device advertises.
    pub key_codes: Vec<u16>,
}

/// The device chosen by [`locate_device`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedDevice {
    pub path: PathBuf,
    pub name: String,
}

/// Enumerates and inspects candidate devices.
pub trait DeviceProbe {
    /// Lists candidate device paths, in any order.
    fn candidates(&self) -> Result<Vec<PathBuf>, DeviceError>;

    /// Opens `path` just long enough to read its identity and capabilities.
    fn probe(&self, path: &Path) -> Result<ProbedDevice, DeviceError>;
}

/// Produces knob presses.
pub trait KeySource: Send {
    /// Returns every press that arrived since the last call, oldest first.
    ///
    /// Must not block.  "No data available" is an empty batch, not an error.
    fn drain(&mut self) -> Result<Vec<KnobKey>, DeviceError>;
}

/// Scans for the knob.  See the module docs for the matching rules.
///
/// # Errors
///
/// Returns [`DeviceError::NotFound`] if no candidate qualifies, or the
/// probe's error if the candidate list itself cannot be produced.
pub fn locate_device(
    probe: &dyn DeviceProbe,
    wanted: DeviceIdentity,
) -> Result<LocatedDevice, DeviceError> {
    let mut candidates = probe.candidates()?;
    candidates.sort();

    for path in candidates {
        let device = match probe.probe(&path) {
            Ok(device) => device,
            Err(e) => {
                debug!("skipping {}: {e}", path.display());
                continue;
            }
        };

        if device.identity != wanted {
            debug!(
                "skipping {} ({}): id {} does not match {wanted}",
                path.display(),
                device.name,
                device.identity
            );
            continue;
        }
        info!(
            "device found - name: {}, id {} at {}",
            device.name,
            device.identity,
            path.display()
        );

        if !has_required_keys(&device.key_codes) {
            info!(
                "device at {} does not support the required keys, skipping",
                path.display()
            );
            continue;
        }

        info!("verified volume knob device: {} at {}", device.name, path.display());
        return Ok(LocatedDevice {
            path,
            name: device.name,
        });
    }

    Err(DeviceError::NotFound { identity: wanted })
}

/// Locates the knob on this machine and opens it for polling.
///
/// # Errors
///
/// Returns [`DeviceError::NotFound`], [`DeviceError::OpenFailed`] or
/// [`DeviceError::InitFailed`]; all of them are fatal for the daemon.
#[cfg(target_os = "linux")]
pub fn open_native_knob(
    wanted: DeviceIdentity,
) -> Result<(LocatedDevice, Box<dyn KeySource>), DeviceError> {
    let located = locate_device(&linux::EvdevProbe::new(), wanted)?;
    let source = linux::EvdevKeySource::open(&located.path)?;
    Ok((located, Box::new(source)))
}

/// Locates the knob on this machine and opens it for polling.
///
/// # Errors
///
/// Always returns [`DeviceError::UnsupportedPlatform`] off Linux.
#[cfg(not(target_os = "linux"))]
pub fn open_native_knob(
    _wanted: DeviceIdentity,
) -> Result<(LocatedDevice, Box<dyn KeySource>), DeviceError> {
    Err(DeviceError::UnsupportedPlatform)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
