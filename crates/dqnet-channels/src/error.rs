use std::net::IpAddr;

/// Errors raised while loading channel tables or resolving samples.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// No channel is configured for this device and physical channel.
    #[error("no channel configured for device {device} channel {channel}")]
    UnconfiguredChannel { device: IpAddr, channel: u8 },

    /// The station file could not be read.
    #[error("failed to load station config: {0}")]
    LoadFailed(String),

    /// The station file is not valid JSON for the expected shape.
    #[error("station config is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A device entry does not hold a valid IP address.
    #[error("device {device:?} has invalid address {address:?}")]
    InvalidDeviceAddress { device: String, address: String },

    /// A channel references a device that is not declared.
    #[error("channel {channel:?} references unknown device {device:?}")]
    UnknownDevice { channel: String, device: String },

    /// A channel index is outside 0..8.
    #[error("channel {channel:?} has index {index}, devices have 8 channels (0-7)")]
    InvalidChannelIndex { channel: String, index: u8 },

    /// Two logical channels claim the same physical channel.
    #[error("channels {first:?} and {second:?} both map to {device} channel {index}")]
    DuplicateChannel {
        first: String,
        second: String,
        device: IpAddr,
        index: u8,
    },
}

pub type Result<T> = std::result::Result<T, ChannelError>;
