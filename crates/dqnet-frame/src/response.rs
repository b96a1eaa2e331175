use std::borrow::Cow;

use bytes::{Buf, Bytes};

use crate::error::{FrameError, Result};

/// Magic number of a text response.
pub const TEXT_MAGIC: u32 = 0x2171_2818;

/// Magic number of an ADC data block.
pub const ADC_DATA_MAGIC: u32 = 0x1414_2135;

/// Text header: magic + group + order + payload length.
pub const TEXT_HEADER_SIZE: usize = 16;

/// ADC header: magic + group + order + cumulative count + sample count.
pub const ADC_HEADER_SIZE: usize = 20;

const MAGIC_SIZE: usize = 4;

/// Acknowledgement or status text sent by a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub group_id: u32,
    pub order: u32,
    /// Payload length as declared in the header.
    pub payload_len: u32,
    /// Payload with trailing NUL, CR and LF removed.
    pub payload: Bytes,
}

impl TextResponse {
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// One block of streamed ADC samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdcDataResponse {
    pub group_id: u32,
    pub order: u32,
    /// Samples the device had sent before this block.
    pub cumulative_count: u32,
    /// Samples carried by this block, as declared in the header.
    pub sample_count: u32,
    /// Raw readings in frame order (channel 0..7, then repeating).
    pub samples: Vec<i16>,
}

/// A decoded device-to-host datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseFrame {
    Text(TextResponse),
    AdcData(AdcDataResponse),
}

impl ResponseFrame {
    pub fn magic(&self) -> u32 {
        match self {
            ResponseFrame::Text(_) => TEXT_MAGIC,
            ResponseFrame::AdcData(_) => ADC_DATA_MAGIC,
        }
    }

    pub fn group_id(&self) -> u32 {
        match self {
            ResponseFrame::Text(text) => text.group_id,
            ResponseFrame::AdcData(adc) => adc.group_id,
        }
    }

    pub fn order(&self) -> u32 {
        match self {
            ResponseFrame::Text(text) => text.order,
            ResponseFrame::AdcData(adc) => adc.order,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResponseFrame::Text(_) => "text",
            ResponseFrame::AdcData(_) => "adc-data",
        }
    }
}

/// Decode one datagram received from a device.
///
/// Wire formats (integers little-endian):
/// ```text
/// text:  ┌────────────┬───────┬───────┬────────────┬─────────────────┐
///        │ 0x21712818 │ Group │ Order │ Length (N) │ Payload (N B)   │
///        └────────────┴───────┴───────┴────────────┴─────────────────┘
/// adc:   ┌────────────┬───────┬───────┬────────────┬───────────┬─────────────────┐
///        │ 0x14142135 │ Group │ Order │ Cumulative │ Count (N) │ Samples (2N B)  │
///        └────────────┴───────┴───────┴────────────┴───────────┴─────────────────┘
/// ```
///
/// The trailing region must be exactly as long as the header says; any
/// difference is a framing error.
pub fn decode_frame(src: &[u8]) -> Result<ResponseFrame> {
    if src.len() < MAGIC_SIZE {
        return Err(FrameError::TruncatedHeader {
            kind: "frame",
            len: src.len(),
            needed: MAGIC_SIZE,
        });
    }

    let magic = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
    match magic {
        TEXT_MAGIC => decode_text(src).map(ResponseFrame::Text),
        ADC_DATA_MAGIC => decode_adc(src).map(ResponseFrame::AdcData),
        other => Err(FrameError::UnrecognizedFrameType {
            magic: other,
            len: src.len(),
        }),
    }
}

fn decode_text(src: &[u8]) -> Result<TextResponse> {
    ensure_header(src, "text", TEXT_HEADER_SIZE)?;

    let mut cursor = &src[MAGIC_SIZE..];
    let group_id = cursor.get_u32_le();
    let order = cursor.get_u32_le();
    let payload_len = cursor.get_u32_le();

    if cursor.len() != payload_len as usize {
        return Err(FrameError::PayloadLengthMismatch {
            kind: "text",
            magic: TEXT_MAGIC,
            declared: payload_len as usize,
            actual: cursor.len(),
        });
    }

    Ok(TextResponse {
        group_id,
        order,
        payload_len,
        payload: Bytes::copy_from_slice(trim_text(cursor)),
    })
}

fn decode_adc(src: &[u8]) -> Result<AdcDataResponse> {
    ensure_header(src, "adc-data", ADC_HEADER_SIZE)?;

    let mut cursor = &src[MAGIC_SIZE..];
    let group_id = cursor.get_u32_le();
    let order = cursor.get_u32_le();
    let cumulative_count = cursor.get_u32_le();
    let sample_count = cursor.get_u32_le();

    // Compare raw bytes against the declared count before decoding, so an
    // odd trailing byte is caught rather than dropped by chunking.
    let declared = (sample_count as usize).saturating_mul(2);
    if cursor.len() != declared {
        return Err(FrameError::PayloadLengthMismatch {
            kind: "adc-data",
            magic: ADC_DATA_MAGIC,
            declared,
            actual: cursor.len(),
        });
    }

    let samples = cursor
        .chunks_exact(2)
        .map(|pair| decode_sample(pair[0], pair[1]))
        .collect();

    Ok(AdcDataResponse {
        group_id,
        order,
        cumulative_count,
        sample_count,
        samples,
    })
}

fn ensure_header(src: &[u8], kind: &'static str, needed: usize) -> Result<()> {
    if src.len() < needed {
        return Err(FrameError::TruncatedHeader {
            kind,
            len: src.len(),
            needed,
        });
    }
    Ok(())
}

/// Reassemble one little-endian sample word as a signed reading.
pub fn decode_sample(lo: u8, hi: u8) -> i16 {
    let word = u16::from(lo) | (u16::from(hi) << 8);
    word as i16
}

/// Strip trailing NULs, then CRs, then LFs, in that order.
fn trim_text(mut payload: &[u8]) -> &[u8] {
    for byte in [b'\0', b'\r', b'\n'] {
        while let Some((&last, rest)) = payload.split_last() {
            if last != byte {
                break;
            }
            payload = rest;
        }
    }
    payload
}
