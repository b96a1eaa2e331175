use std::collections::HashMap;
use std::net::IpAddr;

use serde::Serialize;
use tracing::debug;

use crate::config::StationConfig;
use crate::error::{ChannelError, Result};

/// Physical channels per device; samples cycle through them in frame order.
pub const CHANNELS_PER_DEVICE: usize = 8;

/// Divisor mapping a signed 16-bit reading onto -1.0..1.0.
pub const FULL_SCALE: f64 = 32768.0;

/// Name and scale factors for one physical channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEntry {
    pub name: String,
    pub daq_scale: f64,
    pub value_scale: f64,
}

impl ChannelEntry {
    /// `daq_scale × (raw / 32768) × value_scale`
    pub fn scale(&self, raw: i16) -> f64 {
        self.daq_scale * (f64::from(raw) / FULL_SCALE) * self.value_scale
    }
}

/// One resolved reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledSample {
    pub device: IpAddr,
    pub channel: String,
    pub index: u8,
    pub raw: i16,
    pub value: f64,
}

/// (device, physical channel) to [`ChannelEntry`] lookup table.
#[derive(Debug, Clone, Default)]
pub struct ChannelResolver {
    entries: HashMap<(IpAddr, u8), ChannelEntry>,
    devices: HashMap<String, IpAddr>,
}

impl ChannelResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the lookup table from a station description.
    ///
    /// Device addresses must parse, channels must name a declared device,
    /// indexes must be 0-7 and no physical channel may be claimed twice.
    pub fn from_station(station: &StationConfig) -> Result<Self> {
        let mut resolver = Self::new();

        for (name, address) in &station.devices {
            let ip: IpAddr =
                address
                    .trim()
                    .parse()
                    .map_err(|_| ChannelError::InvalidDeviceAddress {
                        device: name.clone(),
                        address: address.clone(),
                    })?;
            resolver.devices.insert(name.clone(), ip);
        }

        for (name, spec) in &station.channels {
            let ip = resolver.devices.get(&spec.device).copied().ok_or_else(|| {
                ChannelError::UnknownDevice {
                    channel: name.clone(),
                    device: spec.device.clone(),
                }
            })?;
            resolver.insert(ip, spec.channel, name, spec.daq_scale, spec.value_scale)?;
        }

        debug!(
            devices = resolver.devices.len(),
            channels = resolver.entries.len(),
            "channel table built"
        );
        Ok(resolver)
    }

    /// Register one physical channel.
    pub fn insert(
        &mut self,
        device: IpAddr,
        index: u8,
        name: &str,
        daq_scale: f64,
        value_scale: f64,
    ) -> Result<()> {
        if usize::from(index) >= CHANNELS_PER_DEVICE {
            return Err(ChannelError::InvalidChannelIndex {
                channel: name.to_string(),
                index,
            });
        }
        if let Some(existing) = self.entries.get(&(device, index)) {
            return Err(ChannelError::DuplicateChannel {
                first: existing.name.clone(),
                second: name.to_string(),
                device,
                index,
            });
        }
        self.entries.insert(
            (device, index),
            ChannelEntry {
                name: name.to_string(),
                daq_scale,
                value_scale,
            },
        );
        Ok(())
    }

    /// Address of a named device.
    pub fn device_ip(&self, name: &str) -> Option<IpAddr> {
        self.devices.get(name).copied()
    }

    /// Addresses of every declared device.
    pub fn device_ips(&self) -> Vec<IpAddr> {
        let mut ips: Vec<IpAddr> = self.devices.values().copied().collect();
        ips.sort();
        ips.dedup();
        ips
    }

    /// Look up the channel a physical index maps to.
    pub fn entry(&self, device: IpAddr, index: u8) -> Result<&ChannelEntry> {
        self.entries
            .get(&(device, index))
            .ok_or(ChannelError::UnconfiguredChannel {
                device,
                channel: index,
            })
    }

    /// Name and scaled value of the `sample_index`-th sample of a frame.
    pub fn resolve_and_scale(
        &self,
        device: IpAddr,
        sample_index: usize,
        raw: i16,
    ) -> Result<(&str, f64)> {
        let index = channel_index(sample_index);
        let entry = self.entry(device, index)?;
        Ok((entry.name.as_str(), entry.scale(raw)))
    }

    /// Resolve every sample of one frame, stopping at the first gap in the table.
    pub fn scale_frame(&self, device: IpAddr, samples: &[i16]) -> Result<Vec<ScaledSample>> {
        samples
            .iter()
            .enumerate()
            .map(|(i, &raw)| {
                let index = channel_index(i);
                let entry = self.entry(device, index)?;
                Ok(ScaledSample {
                    device,
                    channel: entry.name.clone(),
                    index,
                    raw,
                    value: entry.scale(raw),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn channel_index(sample_index: usize) -> u8 {
    (sample_index % CHANNELS_PER_DEVICE) as u8
}
