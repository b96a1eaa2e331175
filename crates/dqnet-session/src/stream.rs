use std::net::IpAddr;
use std::time::Duration;

use dqnet_channels::{ChannelResolver, ScaledSample};
use dqnet_frame::{decode_frame, ResponseFrame, ResyncEvent, SyncState, TextResponse};
use dqnet_transport::DatagramPort;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// Running totals for one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    /// ADC blocks decoded.
    pub frames: u64,
    pub samples: u64,
    pub resyncs: u64,
    pub text_responses: u64,
    /// Reads that timed out with no traffic.
    pub idle_polls: u64,
}

/// Outcome of one [`StreamSession::poll`].
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// One ADC block, resolved and scaled.
    Samples {
        device: IpAddr,
        group_id: u32,
        order: u32,
        cumulative_count: u32,
        samples: Vec<ScaledSample>,
        resync: Option<ResyncEvent>,
    },
    /// A status line from a device.
    Text {
        device: IpAddr,
        response: TextResponse,
    },
    /// The read timeout expired with no traffic.
    Idle,
}

/// Receives ADC streams and turns them into named, scaled samples.
///
/// Owns the per-device sample tallies for its lifetime; a new session
/// starts every device at zero.
#[derive(Debug)]
pub struct StreamSession<P> {
    port: P,
    resolver: ChannelResolver,
    sync: SyncState,
    stats: StreamStats,
    read_timeout: Duration,
}

impl<P: DatagramPort> StreamSession<P> {
    pub fn new(port: P, resolver: ChannelResolver, config: &SessionConfig) -> Self {
        Self {
            port,
            resolver,
            sync: SyncState::new(),
            stats: StreamStats::default(),
            read_timeout: config.read_timeout,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Wait for one datagram and decode it.
    ///
    /// Framing errors and samples on unconfigured channels are fatal and
    /// leave the device's sample tally untouched. A cumulative-count
    /// mismatch is reported on the event and logged.
    pub fn poll(&mut self) -> Result<StreamEvent> {
        let Some(datagram) = self.port.recv_timeout(self.read_timeout)? else {
            self.stats.idle_polls += 1;
            return Ok(StreamEvent::Idle);
        };

        let response = decode_frame(&datagram.payload).map_err(|source| SessionError::Decode {
            sender: datagram.sender,
            source,
        })?;
        let device = datagram.sender.ip();

        match response {
            ResponseFrame::AdcData(block) => {
                let samples = self.resolver.scale_frame(device, &block.samples)?;
                let resync = self.sync.observe(device, &block);
                if let Some(event) = &resync {
                    self.stats.resyncs += 1;
                    warn!(
                        %device,
                        expected = event.expected,
                        reported = event.reported,
                        gap = event.gap(),
                        "sample count mismatch, resynchronized"
                    );
                }
                self.stats.frames += 1;
                self.stats.samples += samples.len() as u64;
                debug!(%device, samples = samples.len(), "adc block decoded");
                Ok(StreamEvent::Samples {
                    device,
                    group_id: block.group_id,
                    order: block.order,
                    cumulative_count: block.cumulative_count,
                    samples,
                    resync,
                })
            }
            ResponseFrame::Text(response) => {
                self.stats.text_responses += 1;
                debug!(%device, text = %response.text(), "text response");
                Ok(StreamEvent::Text { device, response })
            }
        }
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    pub fn resolver(&self) -> &ChannelResolver {
        &self.resolver
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_parts(self) -> (P, ChannelResolver, SyncState) {
        (self.port, self.resolver, self.sync)
    }
}

#[cfg(test)]
mod tests {
    use dqnet_channels::{ChannelError, StationConfig};
    use dqnet_frame::FrameError;

    use super::*;
    use crate::testing::{adc_frame, text_frame, ScriptedPort};

    const DEVICE: &str = "192.168.1.50:1234";

    fn resolver() -> ChannelResolver {
        let station = StationConfig::from_json(
            r#"{
                "devices": { "rack": "192.168.1.50" },
                "channels": {
                    "load": { "device": "rack", "channel": 0, "daq_scale": 1.0, "value_scale": 1000.0 },
                    "temp": { "device": "rack", "channel": 1, "daq_scale": 10.0 }
                }
            }"#,
        )
        .unwrap();
        ChannelResolver::from_station(&station).unwrap()
    }

    fn session(port: &mut ScriptedPort) -> StreamSession<&mut ScriptedPort> {
        StreamSession::new(port, resolver(), &SessionConfig::default())
    }

    #[test]
    fn scales_adc_blocks() {
        let mut port = ScriptedPort::new();
        port.push(adc_frame(0, &[16384, -32768]), DEVICE);
        let mut stream = session(&mut port);

        let StreamEvent::Samples {
            samples, resync, ..
        } = stream.poll().unwrap()
        else {
            panic!("expected samples");
        };
        assert!(resync.is_none());
        assert_eq!(samples[0].channel, "load");
        assert_eq!(samples[0].value, 500.0);
        assert_eq!(samples[1].channel, "temp");
        assert_eq!(samples[1].value, -10.0);
        assert_eq!(stream.stats().samples, 2);
    }

    #[test]
    fn gap_in_stream_is_an_event() {
        let mut port = ScriptedPort::new();
        port.push(adc_frame(0, &[0, 0]), DEVICE);
        port.push(adc_frame(40, &[0, 0]), DEVICE);
        port.push(adc_frame(42, &[0, 0]), DEVICE);
        let mut stream = session(&mut port);

        stream.poll().unwrap();
        let StreamEvent::Samples { resync, .. } = stream.poll().unwrap() else {
            panic!("expected samples");
        };
        let event = resync.expect("gap should resync");
        assert_eq!(event.expected, 2);
        assert_eq!(event.reported, 40);

        let StreamEvent::Samples { resync, .. } = stream.poll().unwrap() else {
            panic!("expected samples");
        };
        assert!(resync.is_none());

        let stats = stream.stats();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.resyncs, 1);
        assert_eq!(stream.sync_state().counter("192.168.1.50".parse().unwrap()), 44);
    }

    #[test]
    fn text_and_idle_events() {
        let mut port = ScriptedPort::new();
        port.push(text_frame(1, b"running\0"), DEVICE);
        let mut stream = session(&mut port);

        let StreamEvent::Text { response, .. } = stream.poll().unwrap() else {
            panic!("expected text");
        };
        assert_eq!(response.text(), "running");
        assert_eq!(stream.poll().unwrap(), StreamEvent::Idle);
        assert_eq!(stream.stats().text_responses, 1);
        assert_eq!(stream.stats().idle_polls, 1);
    }

    #[test]
    fn unconfigured_channel_is_fatal() {
        let mut port = ScriptedPort::new();
        port.push(adc_frame(0, &[1, 2, 3]), DEVICE);
        let mut stream = session(&mut port);

        let err = stream.poll().unwrap_err();
        assert!(matches!(
            err,
            SessionError::Channel(ChannelError::UnconfiguredChannel { channel: 2, .. })
        ));
    }

    #[test]
    fn rejected_block_leaves_tally_alone() {
        let device: IpAddr = "192.168.1.50".parse().unwrap();
        let mut port = ScriptedPort::new();
        port.push(adc_frame(0, &[0, 0]), DEVICE);
        port.push(adc_frame(100, &[0, 0, 0]), DEVICE);
        port.push(adc_frame(2, &[0, 0]), DEVICE);
        let mut stream = session(&mut port);

        stream.poll().unwrap();
        let err = stream.poll().unwrap_err();
        assert!(matches!(
            err,
            SessionError::Channel(ChannelError::UnconfiguredChannel { channel: 2, .. })
        ));
        assert_eq!(stream.sync_state().counter(device), 2);
        assert_eq!(stream.stats().resyncs, 0);
        assert_eq!(stream.stats().frames, 1);

        let StreamEvent::Samples { resync, .. } = stream.poll().unwrap() else {
            panic!("expected samples");
        };
        assert!(resync.is_none());
        assert_eq!(stream.sync_state().counter(device), 4);
    }

    #[test]
    fn unknown_frame_is_fatal() {
        let mut port = ScriptedPort::new();
        port.push(vec![0xDE, 0xAD, 0xBE, 0xEF], DEVICE);
        let mut stream = session(&mut port);

        let err = stream.poll().unwrap_err();
        assert!(matches!(
            err,
            SessionError::Decode {
                source: FrameError::UnrecognizedFrameType { magic: 0xEFBE_ADDE, len: 4 },
                ..
            }
        ));
    }
}
