//! `/etc/default/usbvol` configuration loader.
//!
//! # File format (for beginners)
//!
//! The file uses the same `KEY=VALUE` layout as other files under
//! `/etc/default`, so a systemd unit can also read it as an
//! `EnvironmentFile`:
//!
//! ```text
//! # USB id of the knob (hex, "0x" prefix optional)
//! VENDOR_ID=068e
//! PRODUCT_ID=0566
//!
//! # Decibel settings
//! MIN_VOLUME=-144
//! DEFAULT_VOLUME=-40
//! MUTE_VOLUME=-144
//! STEP_SIZE=0.5
//! ```
//!
//! Parsing is forgiving: blank lines and `#` comments are skipped, and a
//! line that is not exactly `KEY=VALUE`, names an unknown key, or carries a
//! value that does not parse is ignored (with a `warn` log) while the
//! default for that key stays in effect.  A bad line never stops the
//! daemon.
//!
//! A missing file is not an error either; the built-in defaults are used.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use usbvol_core::VolumeSettings;

use crate::infrastructure::input_device::DeviceIdentity;

/// Location of the configuration file on an installed system.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/default/usbvol";

/// Default USB vendor id of the knob.
pub const DEFAULT_VENDOR_ID: u16 = 0x068e;

/// Default USB product id of the knob.
pub const DEFAULT_PRODUCT_ID: u16 = 0x0566;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("I/O error reading config at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything the daemon reads from the configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub volume: VolumeSettings,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
            volume: VolumeSettings::default(),
        }
    }
}

impl DaemonConfig {
    /// Returns the USB identity the locator should look for.
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            vendor_id: self.vendor_id,
            product_id: self.product_id,
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Reads and parses the configuration file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file exists but cannot be read.  A
/// missing file yields `Ok(DaemonConfig::default())`.
pub fn load_config(path: &Path) -> Result<DaemonConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let config = parse_config(&text);
            info!("loaded configuration from {}", path.display());
            Ok(config)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let config = DaemonConfig::default();
            info!(
                "config file {} not found, using defaults: min volume {}, default volume {}, mute volume {}, step size {}",
                path.display(),
                config.volume.min_volume,
                config.volume.default_volume,
                config.volume.mute_volume,
                config.volume.step_size
            );
            Ok(config)
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parses configuration text, starting from the defaults.
pub fn parse_config(text: &str) -> DaemonConfig {
    let mut config = DaemonConfig::default();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split('=');
        let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            warn!("config line {}: expected KEY=VALUE, ignoring", index + 1);
            continue;
        };
        let key = key.trim();
        let value = unquote(value.trim());

        if let Err(reason) = apply_entry(&mut config, key, value) {
            warn!("config line {}: {reason}, ignoring", index + 1);
        }
    }

    debug!("effective configuration: {config:?}");
    config
}

fn apply_entry(config: &mut DaemonConfig, key: &str, value: &str) -> Result<(), String> {
    match key {
        "VENDOR_ID" => config.vendor_id = parse_hex_id(value)?,
        "PRODUCT_ID" => config.product_id = parse_hex_id(value)?,
        "MIN_VOLUME" => config.volume.min_volume = parse_decibels(value)?,
        "DEFAULT_VOLUME" => config.volume.default_volume = parse_decibels(value)?,
        "MUTE_VOLUME" => config.volume.mute_volume = parse_decibels(value)?,
        "STEP_SIZE" => {
            let step = parse_decibels(value)?;
            if step <= 0.0 {
                return Err(format!("STEP_SIZE must be positive, got {value}"));
            }
            config.volume.step_size = step;
        }
        other => return Err(format!("unknown key '{other}'")),
    }
    Ok(())
}

fn parse_hex_id(value: &str) -> Result<u16, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16).map_err(|_| format!("'{value}' is not a 16-bit hex id"))
}

fn parse_decibels(value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("'{value}' is not a decibel value"))
}

/// Strips one pair of matching surrounding quotes, as shell-style
/// `/etc/default` files often carry them.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_defaults() {
        let config = parse_config("");
        assert_eq!(config, DaemonConfig::default());
        assert_eq!(config.vendor_id, 0x068e);
        assert_eq!(config.product_id, 0x0566);
        assert_eq!(config.volume.min_volume, -144.0);
        assert_eq!(config.volume.default_volume, -144.0);
        assert_eq!(config.volume.mute_volume, -144.0);
        assert_eq!(config.volume.step_size, 1.0);
    }

    #[test]
    fn test_all_keys_are_applied() {
        // Arrange
        let text = "\
# knob
VENDOR_ID=0x1234
PRODUCT_ID=ABCD

MIN_VOLUME = -90
DEFAULT_VOLUME=-40.5
MUTE_VOLUME=-120
STEP_SIZE=0.5
";

        // Act
        let config = parse_config(text);

        // Assert
        assert_eq!(config.vendor_id, 0x1234);
        assert_eq!(config.product_id, 0xabcd);
        assert_eq!(config.volume.min_volume, -90.0);
        assert_eq!(config.volume.default_volume, -40.5);
        assert_eq!(config.volume.mute_volume, -120.0);
        assert_eq!(config.volume.step_size, 0.5);
    }

    #[test]
    fn test_malformed_lines_are_ignored_individually() {
        // Arrange
        let text = "\
DEFAULT_VOLUME
MIN_VOLUME=-60=-30
STEP_SIZE=loud
UNKNOWN_KEY=3
MUTE_VOLUME=-100
";

        // Act
        let config = parse_config(text);

        // Assert: only the valid line took effect
        assert_eq!(config.volume.mute_volume, -100.0);
        assert_eq!(config.volume.min_volume, -144.0);
        assert_eq!(config.volume.default_volume, -144.0);
        assert_eq!(config.volume.step_size, 1.0);
    }

    #[test]
    fn test_non_positive_or_non_finite_step_is_rejected() {
        assert_eq!(parse_config("STEP_SIZE=0").volume.step_size, 1.0);
        assert_eq!(parse_config("STEP_SIZE=-2").volume.step_size, 1.0);
        assert_eq!(parse_config("STEP_SIZE=inf").volume.step_size, 1.0);
    }

    #[test]
    fn test_out_of_range_hex_id_keeps_default() {
        assert_eq!(parse_config("VENDOR_ID=0x12345").vendor_id, DEFAULT_VENDOR_ID);
        assert_eq!(parse_config("PRODUCT_ID=zz").product_id, DEFAULT_PRODUCT_ID);
    }

    #[test]
    fn test_quoted_values_are_unquoted() {
        let config = parse_config("DEFAULT_VOLUME=\"-30\"\nVENDOR_ID='068f'");
        assert_eq!(config.volume.default_volume, -30.0);
        assert_eq!(config.vendor_id, 0x068f);
    }

    #[test]
    fn test_later_line_overrides_earlier() {
        let config = parse_config("STEP_SIZE=2\nSTEP_SIZE=3");
        assert_eq!(config.volume.step_size, 3.0);
    }

    #[test]
    fn test_identity_combines_ids() {
        let config = parse_config("VENDOR_ID=1\nPRODUCT_ID=2");
        assert_eq!(
            config.identity(),
            DeviceIdentity {
                vendor_id: 1,
                product_id: 2
            }
        );
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = Path::new("/nonexistent/usbvol/config");
        let config = load_config(path).unwrap();
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        // Arrange
        let path = std::env::temp_dir().join(format!("usbvol-config-{}", std::process::id()));
        fs::write(&path, "DEFAULT_VOLUME=-25\n").unwrap();

        // Act
        let config = load_config(&path).unwrap();

        // Assert
        assert_eq!(config.volume.default_volume, -25.0);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_directory_is_io_error() {
        let result = load_config(&std::env::temp_dir());
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
