use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// One received datagram and the address it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub payload: Bytes,
    pub sender: SocketAddr,
}

impl Datagram {
    pub fn new(payload: impl Into<Bytes>, sender: SocketAddr) -> Self {
        Self {
            payload: payload.into(),
            sender,
        }
    }
}

/// A datagram endpoint the protocol layers send through and read from.
///
/// Implemented by [`UdpPort`](crate::UdpPort) for real networks. Tests in
/// the upper crates implement it with scripted in-memory queues.
pub trait DatagramPort {
    /// Send one datagram to a specific address.
    fn send_to(&mut self, payload: &[u8], dest: SocketAddr) -> Result<()>;

    /// Send one datagram to the limited broadcast address on `port`.
    fn broadcast(&mut self, payload: &[u8], port: u16) -> Result<()>;

    /// Block for at most `timeout` waiting for one datagram.
    ///
    /// Returns `Ok(None)` when the timeout expires without traffic.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Datagram>>;
}

impl<P: DatagramPort + ?Sized> DatagramPort for &mut P {
    fn send_to(&mut self, payload: &[u8], dest: SocketAddr) -> Result<()> {
        (**self).send_to(payload, dest)
    }

    fn broadcast(&mut self, payload: &[u8], port: u16) -> Result<()> {
        (**self).broadcast(payload, port)
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Datagram>> {
        (**self).recv_timeout(timeout)
    }
}
