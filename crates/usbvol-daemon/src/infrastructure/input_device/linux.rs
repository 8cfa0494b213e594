//! evdev-backed knob access for Linux.
//!
//! [`EvdevProbe`] inspects `/dev/input/event*` nodes for the locator and
//! [`EvdevKeySource`] reads presses from the chosen node in non-blocking
//! mode, so a poll tick never stalls the event loop.

use std::fs;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use evdev::Device;
use tracing::debug;
use usbvol_core::KnobKey;

use super::{DeviceError, DeviceIdentity, DeviceProbe, KeySource, ProbedDevice};

/// Directory holding the kernel's input event nodes.
pub const INPUT_DIR: &str = "/dev/input";

/// Upper bound on reads per drain, so a device that never runs dry cannot
/// starve the rest of the loop.
const MAX_READS_PER_DRAIN: usize = 64;

/// Probes real input devices through evdev.
#[derive(Debug, Clone)]
pub struct EvdevProbe {
    dir: PathBuf,
}

impl EvdevProbe {
    pub fn new() -> Self {
        Self::with_dir(INPUT_DIR)
    }

    /// Scans `dir` instead of `/dev/input`.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Default for EvdevProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceProbe for EvdevProbe {
    fn candidates(&self) -> Result<Vec<PathBuf>, DeviceError> {
        let scan_failed = |source| DeviceError::ScanFailed {
            dir: self.dir.clone(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(scan_failed)? {
            let entry = entry.map_err(scan_failed)?;
            let is_event_node = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with("event"));
            if is_event_node {
                paths.push(entry.path());
            }
        }
        Ok(paths)
    }

    fn probe(&self, path: &Path) -> Result<ProbedDevice, DeviceError> {
        let device = Device::open(path).map_err(|source| DeviceError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let id = device.input_id();
        let key_codes = device
            .supported_keys()
            .map(|keys| keys.iter().map(|key| key.code()).collect())
            .unwrap_or_default();

        Ok(ProbedDevice {
            name: device.name().unwrap_or("unknown").to_string(),
            identity: DeviceIdentity {
                vendor_id: id.vendor(),
                product_id: id.product(),
            },
            key_codes,
        })
    }
}

/// Reads knob presses from an evdev node.
pub struct EvdevKeySource {
    device: Device,
}

impl EvdevKeySource {
    /// Opens `path` and switches it to non-blocking reads.
    ///
    /// # Errors
    ///
    /// [`DeviceError::OpenFailed`] if the node cannot be opened,
    /// [`DeviceError::InitFailed`] if it cannot be made non-blocking.
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let device = Device::open(path).map_err(|source| DeviceError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        set_nonblocking(&device).map_err(|e| DeviceError::InitFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self { device })
    }
}

impl KeySource for EvdevKeySource {
    fn drain(&mut self) -> Result<Vec<KnobKey>, DeviceError> {
        let mut keys = Vec::new();

        for _ in 0..MAX_READS_PER_DRAIN {
            match self.device.fetch_events() {
                Ok(events) => keys.extend(events.filter_map(|ev| {
                    KnobKey::from_raw_event(ev.event_type().0, ev.code(), ev.value())
                })),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(keys),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                // Presses already read are still delivered; the error will
                // surface again on the next tick if it persists.
                Err(e) if !keys.is_empty() => {
                    debug!("read error after {} presses: {e}", keys.len());
                    return Ok(keys);
                }
                Err(e) => return Err(DeviceError::ReadFailure(e)),
            }
        }

        Ok(keys)
    }
}

fn set_nonblocking(device: &Device) -> io::Result<()> {
    let fd = device.as_raw_fd();

    // SAFETY: `fd` is owned by `device`, which outlives both calls.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: as above; only O_NONBLOCK is added to the existing flags.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
