use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use dqnet_transport::{Datagram, DatagramPort};

/// In-memory port that replays queued datagrams, then times out.
#[derive(Debug, Default)]
pub(crate) struct ScriptedPort {
    pub inbox: VecDeque<Datagram>,
    pub sent: Vec<(Bytes, SocketAddr)>,
    pub broadcasts: Vec<(Bytes, u16)>,
    pub timeouts: usize,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, payload: impl Into<Bytes>, sender: &str) {
        let sender = sender.parse().expect("sender should be a socket address");
        self.inbox.push_back(Datagram::new(payload, sender));
    }
}

impl DatagramPort for ScriptedPort {
    fn send_to(&mut self, payload: &[u8], dest: SocketAddr) -> dqnet_transport::Result<()> {
        self.sent.push((Bytes::copy_from_slice(payload), dest));
        Ok(())
    }

    fn broadcast(&mut self, payload: &[u8], port: u16) -> dqnet_transport::Result<()> {
        self.broadcasts.push((Bytes::copy_from_slice(payload), port));
        Ok(())
    }

    fn recv_timeout(&mut self, _timeout: Duration) -> dqnet_transport::Result<Option<Datagram>> {
        match self.inbox.pop_front() {
            Some(datagram) => Ok(Some(datagram)),
            None => {
                self.timeouts += 1;
                Ok(None)
            }
        }
    }
}

pub(crate) fn text_frame(group: u32, payload: &[u8]) -> Vec<u8> {
    let mut raw = Vec::new();
    raw.extend_from_slice(&dqnet_frame::TEXT_MAGIC.to_le_bytes());
    raw.extend_from_slice(&group.to_le_bytes());
    raw.extend_from_slice(&0u32.to_le_bytes());
    raw.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    raw.extend_from_slice(payload);
    raw
}

pub(crate) fn adc_frame(cumulative: u32, samples: &[i16]) -> Vec<u8> {
    let mut raw = Vec::new();
    raw.extend_from_slice(&dqnet_frame::ADC_DATA_MAGIC.to_le_bytes());
    raw.extend_from_slice(&1u32.to_le_bytes());
    raw.extend_from_slice(&0u32.to_le_bytes());
    raw.extend_from_slice(&cumulative.to_le_bytes());
    raw.extend_from_slice(&(samples.len() as u32).to_le_bytes());
    for sample in samples {
        raw.extend_from_slice(&sample.to_le_bytes());
    }
    raw
}
