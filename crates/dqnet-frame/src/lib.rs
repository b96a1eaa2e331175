//! Wire codec for DATAQ network instruments.
//!
//! Every binary datagram starts with a 4-byte magic number that selects
//! its layout:
//! - `0x31415926`: command sent to a device
//! - `0x21712818`: text response from a device
//! - `0x14142135`: block of ADC samples from a device
//!
//! Discovery replies are plain ASCII and are parsed separately. ADC
//! blocks carry a cumulative sample count that [`SyncState`] checks to
//! detect packet loss.

pub mod command;
pub mod discovery;
pub mod error;
pub mod response;
pub mod sync;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use command::{
    encode, CommandFrame, CommandName, COMMAND_HEADER_SIZE, COMMAND_MAGIC, DEVICE_COMMAND_PORT,
};
pub use discovery::{
    parse_discovery_datagram, parse_discovery_reply, DeviceRecord, DeviceRole,
    DEVICE_DISCOVERY_PORT, DISCOVERY_TOKEN,
};
pub use error::{FrameError, Result};
pub use response::{
    decode_frame, decode_sample, AdcDataResponse, ResponseFrame, TextResponse, ADC_DATA_MAGIC,
    ADC_HEADER_SIZE, TEXT_HEADER_SIZE, TEXT_MAGIC,
};
pub use sync::{decode_datagram, DecodedFrame, ResyncEvent, SyncState};

#[cfg(feature = "async")]
pub use tokio_codec::DqCodec;
