use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChannelError, Result};

/// One logical channel in the station file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    /// Name of the device in [`StationConfig::devices`].
    pub device: String,
    /// Physical channel, 0-7.
    pub channel: u8,
    /// Converts a full-scale reading to the DAQ's input units.
    pub daq_scale: f64,
    /// Converts DAQ input units to engineering units.
    #[serde(default = "unit_scale")]
    pub value_scale: f64,
}

fn unit_scale() -> f64 {
    1.0
}

/// Station layout: which devices exist and what each channel measures.
///
/// ```json
/// {
///   "devices": { "rack_a": "192.168.1.50" },
///   "channels": {
///     "pressure": { "device": "rack_a", "channel": 0, "daq_scale": 10.0, "value_scale": 100.0 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationConfig {
    /// Device name to IP address.
    #[serde(default)]
    pub devices: BTreeMap<String, String>,
    /// Logical channel name to its physical location and scaling.
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
}

/// Limits applied when reading a station file from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Maximum bytes accepted from a station file.
    pub max_file_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024,
        }
    }
}

impl StationConfig {
    /// Parse a station description from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a station file with default limits.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_file_with_config(path, LoaderConfig::default())
    }

    /// Load a station file with explicit limits.
    pub fn from_file_with_config(path: &Path, config: LoaderConfig) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|err| ChannelError::LoadFailed(format!("{}: {err}", path.display())))?;

        let read_limit = u64::try_from(config.max_file_size.saturating_add(1)).unwrap_or(u64::MAX);
        let mut content = String::new();
        file.take(read_limit)
            .read_to_string(&mut content)
            .map_err(|err| {
                ChannelError::LoadFailed(format!("failed reading {}: {err}", path.display()))
            })?;
        if content.len() > config.max_file_size {
            return Err(ChannelError::LoadFailed(format!(
                "{} exceeds {} bytes",
                path.display(),
                config.max_file_size
            )));
        }

        let station = Self::from_json(&content)?;
        debug!(
            path = %path.display(),
            devices = station.devices.len(),
            channels = station.channels.len(),
            "loaded station config"
        );
        Ok(station)
    }
}
