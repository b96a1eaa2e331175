//! Channel naming and scaling for DATAQ ADC streams.
//!
//! A station file maps device names to addresses and logical channel
//! names to a (device, physical channel) pair plus two scale factors.
//! [`ChannelResolver`] indexes that table once so each sample is resolved
//! with a single hash lookup.

pub mod config;
pub mod error;
pub mod resolver;

pub use config::{ChannelConfig, LoaderConfig, StationConfig};
pub use error::{ChannelError, Result};
pub use resolver::{
    ChannelEntry, ChannelResolver, ScaledSample, CHANNELS_PER_DEVICE, FULL_SCALE,
};
