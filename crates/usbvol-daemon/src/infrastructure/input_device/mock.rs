//! Mock input devices for unit and integration testing.
//!
//! [`ScriptedKeySource`] replays queued drain results without a physical
//! knob; [`MockDeviceProbe`] serves a fixed table of fake devices to the
//! locator.

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};

use usbvol_core::KnobKey;

use super::{DeviceError, DeviceIdentity, DeviceProbe, KeySource, ProbedDevice};

/// A [`KeySource`] that returns pre-queued batches, one per `drain()`.
///
/// Once the script is exhausted every drain returns an empty batch, as a
/// real idle device would.
#[derive(Debug, Default)]
pub struct ScriptedKeySource {
    script: VecDeque<Result<Vec<KnobKey>, io::ErrorKind>>,
    drains: usize,
}

impl ScriptedKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a batch of presses for a future drain.
    pub fn push_batch(&mut self, keys: Vec<KnobKey>) {
        self.script.push_back(Ok(keys));
    }

    /// Queues a read failure for a future drain.
    pub fn push_failure(&mut self, kind: io::ErrorKind) {
        self.script.push_back(Err(kind));
    }

    /// Returns how many times `drain()` has been called.
    pub fn drain_count(&self) -> usize {
        self.drains
    }

    /// Returns `true` once every queued result has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }
}

impl KeySource for ScriptedKeySource {
    fn drain(&mut self) -> Result<Vec<KnobKey>, DeviceError> {
        self.drains += 1;
        match self.script.pop_front() {
            Some(Ok(keys)) => Ok(keys),
            Some(Err(kind)) => Err(DeviceError::ReadFailure(io::Error::from(kind))),
            None => Ok(Vec::new()),
        }
    }
}

/// A [`DeviceProbe`] backed by an in-memory device table.
#[derive(Debug, Default)]
pub struct MockDeviceProbe {
    devices: BTreeMap<PathBuf, Option<ProbedDevice>>,
}

impl MockDeviceProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device that opens successfully.
    pub fn add_device(
        &mut self,
        path: &str,
        name: &str,
        identity: DeviceIdentity,
        key_codes: Vec<u16>,
    ) {
        self.devices.insert(
            PathBuf::from(path),
            Some(ProbedDevice {
                name: name.to_string(),
                identity,
                key_codes,
            }),
        );
    }

    /// Registers a device node that fails to open (e.g. permission denied).
    pub fn add_unopenable(&mut self, path: &str) {
        self.devices.insert(PathBuf::from(path), None);
    }
}

impl DeviceProbe for MockDeviceProbe {
    fn candidates(&self) -> Result<Vec<PathBuf>, DeviceError> {
        // Reverse order so callers cannot rely on the probe for sorting.
        Ok(self.devices.keys().rev().cloned().collect())
    }

    fn probe(&self, path: &Path) -> Result<ProbedDevice, DeviceError> {
        match self.devices.get(path) {
            Some(Some(device)) => Ok(device.clone()),
            Some(None) => Err(DeviceError::OpenFailed {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            }),
            None => Err(DeviceError::OpenFailed {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_source_replays_batches_then_goes_idle() {
        // Arrange
        let mut source = ScriptedKeySource::new();
        source.push_batch(vec![KnobKey::Mute]);
        source.push_failure(io::ErrorKind::BrokenPipe);

        // Act / Assert
        assert_eq!(source.drain().unwrap(), vec![KnobKey::Mute]);
        assert!(matches!(source.drain(), Err(DeviceError::ReadFailure(_))));
        assert!(source.drain().unwrap().is_empty());
        assert_eq!(source.drain_count(), 3);
        assert!(source.is_exhausted());
    }

    #[test]
    fn test_mock_probe_reports_unopenable_device_as_open_failed() {
        let mut probe = MockDeviceProbe::new();
        probe.add_unopenable("/dev/input/event0");

        let result = probe.probe(Path::new("/dev/input/event0"));

        assert!(matches!(result, Err(DeviceError::OpenFailed { .. })));
    }
}
