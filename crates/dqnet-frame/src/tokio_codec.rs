use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::command::CommandFrame;
use crate::error::FrameError;
use crate::response::{decode_frame, ResponseFrame};

/// Datagram codec for `tokio_util::udp::UdpFramed`.
///
/// `UdpFramed` hands the decoder one whole datagram at a time, so every
/// call consumes the entire buffer, including on error. Stream
/// synchronization is left to the caller, which also sees the sender
/// address: feed ADC blocks to [`SyncState::observe`](crate::SyncState::observe).
#[derive(Debug, Clone, Copy, Default)]
pub struct DqCodec;

impl Decoder for DqCodec {
    type Item = ResponseFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let result = decode_frame(&src[..]);
        src.clear();
        result.map(Some)
    }
}

impl Encoder<CommandFrame> for DqCodec {
    type Error = FrameError;

    fn encode(&mut self, item: CommandFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode_into(dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use bytes::BufMut;
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::UdpSocket;
    use tokio_util::udp::UdpFramed;

    use super::*;
    use crate::command::CommandName;
    use crate::response::{ADC_DATA_MAGIC, TEXT_MAGIC};
    use crate::sync::SyncState;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn decoder_consumes_whole_datagram() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(TEXT_MAGIC);
        buf.put_u32_le(1);
        buf.put_u32_le(0);
        buf.put_u32_le(3);
        buf.put_slice(b"ok\0");

        let frame = DqCodec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(frame, ResponseFrame::Text(t) if t.text() == "ok"));
        assert!(buf.is_empty());
    }

    #[test]
    fn decoder_clears_buffer_on_error() {
        let mut buf = BytesMut::from(&[0u8, 1, 2, 3, 4, 5][..]);
        let err = DqCodec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::UnrecognizedFrameType { .. }));
        assert!(buf.is_empty());
        assert!(DqCodec.decode(&mut buf).unwrap().is_none());
    }

    #[tokio::test]
    async fn udp_framed_sends_commands() {
        let device = UdpSocket::bind(loopback()).await.unwrap();
        let device_addr = device.local_addr().unwrap();
        let host = UdpSocket::bind(loopback()).await.unwrap();
        let mut framed = UdpFramed::new(host, DqCodec);

        let command = CommandFrame::new(3, CommandName::SyncStart).with_args(1, 0, 0);
        framed.send((command.clone(), device_addr)).await.unwrap();

        let mut buf = [0u8; 256];
        let (n, _) = tokio::time::timeout(Duration::from_secs(2), device.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(CommandFrame::decode(&buf[..n]).unwrap(), command);
    }

    #[tokio::test]
    async fn udp_framed_yields_adc_blocks() {
        let device = UdpSocket::bind(loopback()).await.unwrap();
        let host = UdpSocket::bind(loopback()).await.unwrap();
        let host_addr = host.local_addr().unwrap();
        let mut framed = UdpFramed::new(host, DqCodec);

        let mut raw = BytesMut::new();
        raw.put_u32_le(ADC_DATA_MAGIC);
        raw.put_u32_le(0);
        raw.put_u32_le(0);
        raw.put_u32_le(0);
        raw.put_u32_le(2);
        raw.put_slice(&[0xFF, 0xFF, 0x00, 0x40]);
        device.send_to(&raw, host_addr).await.unwrap();

        let (frame, sender) = tokio::time::timeout(Duration::from_secs(2), framed.next())
            .await
            .unwrap()
            .expect("stream should yield a frame")
            .unwrap();
        assert_eq!(sender, device.local_addr().unwrap());

        let ResponseFrame::AdcData(block) = frame else {
            panic!("expected adc block");
        };
        assert_eq!(block.samples, vec![-1, 16384]);

        let mut sync = SyncState::new();
        assert!(sync.observe(sender.ip(), &block).is_none());
        assert_eq!(sync.counter(sender.ip()), 2);
    }
}
