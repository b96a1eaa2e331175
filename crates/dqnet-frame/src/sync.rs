use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use tracing::debug;

use crate::error::Result;
use crate::response::{decode_frame, AdcDataResponse, ResponseFrame};

/// A device's cumulative count disagreed with the local tally.
///
/// Raised when packets were lost (or the device restarted its stream).
/// The local counter has already been reset to `reported` when this is
/// returned; the frame's samples are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncEvent {
    pub device: IpAddr,
    /// Local tally before the frame arrived.
    pub expected: u32,
    /// Cumulative count carried by the frame.
    pub reported: u32,
}

impl ResyncEvent {
    /// Samples skipped by the device relative to the local tally.
    ///
    /// Negative when the device count went backwards.
    pub fn gap(&self) -> i64 {
        i64::from(self.reported) - i64::from(self.expected)
    }
}

/// Per-device running sample totals for one session.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    counters: HashMap<IpAddr, u32>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tally for a device; 0 before its first frame.
    pub fn counter(&self, device: IpAddr) -> u32 {
        self.counters.get(&device).copied().unwrap_or(0)
    }

    /// Devices that have sent at least one ADC block.
    pub fn devices(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.counters.keys().copied()
    }

    /// Apply one ADC block to the device's tally.
    ///
    /// On disagreement the device's cumulative count wins. Either way the
    /// block's sample count is then added. Counters wrap like the device's
    /// 32-bit field.
    pub fn observe(&mut self, device: IpAddr, block: &AdcDataResponse) -> Option<ResyncEvent> {
        let counter = self.counters.entry(device).or_insert(0);
        let expected = *counter;

        let resync = if block.cumulative_count != expected {
            *counter = block.cumulative_count;
            Some(ResyncEvent {
                device,
                expected,
                reported: block.cumulative_count,
            })
        } else {
            None
        };

        *counter = counter.wrapping_add(block.sample_count);
        debug!(%device, counter = *counter, "sample tally updated");
        resync
    }
}

/// A decoded datagram with its origin and any resynchronization it caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub sender: SocketAddr,
    pub response: ResponseFrame,
    pub resync: Option<ResyncEvent>,
}

/// Decode a datagram and, for ADC blocks, update the sender's tally.
///
/// Framing errors are returned untouched and leave `sync` unchanged.
pub fn decode_datagram(
    raw: &[u8],
    sender: SocketAddr,
    sync: &mut SyncState,
) -> Result<DecodedFrame> {
    let response = decode_frame(raw)?;
    let resync = match &response {
        ResponseFrame::AdcData(block) => sync.observe(sender.ip(), block),
        ResponseFrame::Text(_) => None,
    };
    Ok(DecodedFrame {
        sender,
        response,
        resync,
    })
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::error::FrameError;
    use crate::response::{ADC_DATA_MAGIC, TEXT_MAGIC};

    fn device() -> SocketAddr {
        "192.168.1.50:1234".parse().unwrap()
    }

    fn adc(cumulative: u32, samples: &[i16]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u32_le(ADC_DATA_MAGIC);
        buf.put_u32_le(1);
        buf.put_u32_le(0);
        buf.put_u32_le(cumulative);
        buf.put_u32_le(samples.len() as u32);
        for sample in samples {
            buf.put_i16_le(*sample);
        }
        buf.to_vec()
    }

    #[test]
    fn contiguous_blocks_do_not_resync() {
        let mut sync = SyncState::new();

        let first = decode_datagram(&adc(0, &[1; 8]), device(), &mut sync).unwrap();
        assert!(first.resync.is_none());
        assert_eq!(sync.counter(device().ip()), 8);

        let second = decode_datagram(&adc(8, &[2; 8]), device(), &mut sync).unwrap();
        assert!(second.resync.is_none());
        assert_eq!(sync.counter(device().ip()), 16);
    }

    #[test]
    fn jump_resets_counter_and_keeps_samples() {
        let mut sync = SyncState::new();
        decode_datagram(&adc(0, &[0; 8]), device(), &mut sync).unwrap();

        let jumped =
            decode_datagram(&adc(1000, &[7, -7, 3, -3]), device(), &mut sync).unwrap();

        assert_eq!(
            jumped.resync,
            Some(ResyncEvent {
                device: device().ip(),
                expected: 8,
                reported: 1000,
            })
        );
        assert_eq!(jumped.resync.unwrap().gap(), 992);
        assert_eq!(sync.counter(device().ip()), 1004);
        let ResponseFrame::AdcData(block) = jumped.response else {
            panic!("expected adc block");
        };
        assert_eq!(block.samples, vec![7, -7, 3, -3]);
    }

    #[test]
    fn first_block_from_running_device_resyncs() {
        let mut sync = SyncState::new();
        let decoded = decode_datagram(&adc(5_000, &[0; 8]), device(), &mut sync).unwrap();
        assert_eq!(decoded.resync.map(|e| e.expected), Some(0));
        assert_eq!(sync.counter(device().ip()), 5_008);
    }

    #[test]
    fn counters_are_per_device_ip() {
        let mut sync = SyncState::new();
        let other: SocketAddr = "192.168.1.51:1234".parse().unwrap();
        let same_ip_other_port: SocketAddr = "192.168.1.50:9999".parse().unwrap();

        decode_datagram(&adc(0, &[0; 8]), device(), &mut sync).unwrap();
        decode_datagram(&adc(0, &[0; 16]), other, &mut sync).unwrap();
        let next = decode_datagram(&adc(8, &[0; 8]), same_ip_other_port, &mut sync).unwrap();

        assert!(next.resync.is_none());
        assert_eq!(sync.counter(device().ip()), 16);
        assert_eq!(sync.counter(other.ip()), 16);
        assert_eq!(sync.devices().count(), 2);
    }

    #[test]
    fn counter_wraps_with_device_field() {
        let mut sync = SyncState::new();
        decode_datagram(&adc(u32::MAX - 3, &[0; 8]), device(), &mut sync).unwrap();
        assert_eq!(sync.counter(device().ip()), 4);
        let next = decode_datagram(&adc(4, &[0; 8]), device(), &mut sync).unwrap();
        assert!(next.resync.is_none());
    }

    #[test]
    fn text_frames_leave_counters_alone() {
        let mut sync = SyncState::new();
        let mut buf = BytesMut::new();
        buf.put_u32_le(TEXT_MAGIC);
        buf.put_u32_le(0);
        buf.put_u32_le(0);
        buf.put_u32_le(2);
        buf.put_slice(b"ok");

        let decoded = decode_datagram(&buf, device(), &mut sync).unwrap();
        assert!(decoded.resync.is_none());
        assert_eq!(sync.devices().count(), 0);
    }

    #[test]
    fn framing_error_leaves_state_untouched() {
        let mut sync = SyncState::new();
        let mut bad = adc(0, &[0; 8]);
        bad.pop();

        let err = decode_datagram(&bad, device(), &mut sync).unwrap_err();
        assert!(matches!(err, FrameError::PayloadLengthMismatch { .. }));
        assert_eq!(sync.devices().count(), 0);
    }
}
