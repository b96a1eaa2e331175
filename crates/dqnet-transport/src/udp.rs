use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{Datagram, DatagramPort};

/// Receive buffer size. DATAQ devices never emit datagrams larger than this.
pub const DEFAULT_RECV_BUFFER: usize = 2048;

/// Blocking UDP port backed by `std::net::UdpSocket`.
///
/// One socket serves discovery, commands and the data stream: devices
/// answer discovery broadcasts and stream ADC frames to the PC's receiving
/// port, so binding that port once is enough.
pub struct UdpPort {
    socket: UdpSocket,
    local_addr: SocketAddr,
    buf: Vec<u8>,
}

impl UdpPort {
    /// Bind a UDP port with broadcast enabled.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        Self::bind_with_buffer(addr, DEFAULT_RECV_BUFFER)
    }

    /// Bind a UDP port with an explicit receive buffer size.
    pub fn bind_with_buffer(addr: SocketAddr, recv_buffer: usize) -> Result<Self> {
        let socket = UdpSocket::bind(addr).map_err(|e| TransportError::Bind { addr, source: e })?;
        socket
            .set_broadcast(true)
            .map_err(|e| TransportError::Bind { addr, source: e })?;
        let local_addr = socket.local_addr()?;

        info!(%local_addr, "bound udp port");

        Ok(Self {
            socket,
            local_addr,
            buf: vec![0u8; recv_buffer.max(1)],
        })
    }

    /// The address this port is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn send_checked(&self, payload: &[u8], dest: SocketAddr) -> Result<()> {
        let sent = self
            .socket
            .send_to(payload, dest)
            .map_err(|e| TransportError::Send {
                addr: dest,
                len: payload.len(),
                source: e,
            })?;
        if sent != payload.len() {
            return Err(TransportError::ShortSend {
                addr: dest,
                sent,
                len: payload.len(),
            });
        }
        debug!(%dest, len = payload.len(), "sent datagram");
        Ok(())
    }
}

impl DatagramPort for UdpPort {
    fn send_to(&mut self, payload: &[u8], dest: SocketAddr) -> Result<()> {
        self.send_checked(payload, dest)
    }

    fn broadcast(&mut self, payload: &[u8], port: u16) -> Result<()> {
        let dest = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, port));
        self.send_checked(payload, dest)
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Datagram>> {
        if timeout.is_zero() {
            return Err(TransportError::ZeroTimeout);
        }
        self.socket.set_read_timeout(Some(timeout))?;

        loop {
            match self.socket.recv_from(&mut self.buf) {
                Ok((n, sender)) => {
                    debug!(%sender, len = n, "received datagram");
                    return Ok(Some(Datagram {
                        payload: Bytes::copy_from_slice(&self.buf[..n]),
                        sender,
                    }));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Ok(None);
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl std::fmt::Debug for UdpPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpPort")
            .field("local_addr", &self.local_addr)
            .field("recv_buffer", &self.buf.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    #[test]
    fn test_send_and_receive_over_loopback() {
        let mut server = UdpPort::bind(loopback()).unwrap();
        let mut client = UdpPort::bind(loopback()).unwrap();

        client.send_to(b"hello", server.local_addr()).unwrap();

        let datagram = server
            .recv_timeout(Duration::from_secs(2))
            .unwrap()
            .expect("datagram should arrive");
        assert_eq!(datagram.payload.as_ref(), b"hello");
        assert_eq!(datagram.sender, client.local_addr());
    }

    #[test]
    fn test_timeout_is_not_an_error() {
        let mut port = UdpPort::bind(loopback()).unwrap();
        let result = port.recv_timeout(Duration::from_millis(20)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut port = UdpPort::bind(loopback()).unwrap();
        let result = port.recv_timeout(Duration::ZERO);
        assert!(matches!(result, Err(TransportError::ZeroTimeout)));
    }

    #[test]
    fn test_bind_conflict_reports_address() {
        let first = UdpPort::bind(loopback()).unwrap();
        let taken = first.local_addr();
        let result = UdpPort::bind(taken);
        match result {
            Err(TransportError::Bind { addr, .. }) => assert_eq!(addr, taken),
            other => panic!("expected bind error, got {other:?}"),
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_oversized_datagram_truncated_to_buffer() {
        let mut server = UdpPort::bind_with_buffer(loopback(), 8).unwrap();
        let mut client = UdpPort::bind(loopback()).unwrap();

        client
            .send_to(b"0123456789abcdef", server.local_addr())
            .unwrap();

        let datagram = server
            .recv_timeout(Duration::from_secs(2))
            .unwrap()
            .expect("datagram should arrive");
        assert_eq!(datagram.payload.as_ref(), b"01234567");
    }

    fn send_through<P: DatagramPort>(mut port: P, dest: SocketAddr) {
        port.send_to(b"ref", dest).unwrap();
    }

    #[test]
    fn test_mut_ref_forwards_to_port() {
        let mut server = UdpPort::bind(loopback()).unwrap();
        let mut client = UdpPort::bind(loopback()).unwrap();

        send_through(&mut client, server.local_addr());

        let got = server
            .recv_timeout(Duration::from_secs(2))
            .unwrap()
            .expect("datagram should arrive");
        assert_eq!(got.payload.as_ref(), b"ref");
        assert_eq!(got.sender, client.local_addr());
    }
}
