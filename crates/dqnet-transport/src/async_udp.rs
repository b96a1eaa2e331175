use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Datagram;
use crate::udp::DEFAULT_RECV_BUFFER;

/// Tokio counterpart of [`UdpPort`](crate::UdpPort).
///
/// Same semantics: broadcast enabled, timeouts reported as `Ok(None)`.
/// Use [`AsyncUdpPort::into_socket`] to hand the socket to
/// `tokio_util::udp::UdpFramed`.
#[derive(Debug)]
pub struct AsyncUdpPort {
    socket: UdpSocket,
    local_addr: SocketAddr,
    buf: Vec<u8>,
}

impl AsyncUdpPort {
    /// Bind a UDP port with broadcast enabled.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| TransportError::Bind { addr, source: e })?;
        socket
            .set_broadcast(true)
            .map_err(|e| TransportError::Bind { addr, source: e })?;
        let local_addr = socket.local_addr()?;

        info!(%local_addr, "bound async udp port");

        Ok(Self {
            socket,
            local_addr,
            buf: vec![0u8; DEFAULT_RECV_BUFFER],
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn send_to(&self, payload: &[u8], dest: SocketAddr) -> Result<()> {
        let sent = self
            .socket
            .send_to(payload, dest)
            .await
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

    pub async fn broadcast(&self, payload: &[u8], port: u16) -> Result<()> {
        let dest = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, port));
        self.send_to(payload, dest).await
    }

    /// Wait at most `timeout` for one datagram; `Ok(None)` on expiry.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Datagram>> {
        if timeout.is_zero() {
            return Err(TransportError::ZeroTimeout);
        }
        match tokio::time::timeout(timeout, self.socket.recv_from(&mut self.buf)).await {
            Ok(Ok((n, sender))) => {
                debug!(%sender, len = n, "received datagram");
                Ok(Some(Datagram {
                    payload: Bytes::copy_from_slice(&self.buf[..n]),
                    sender,
                }))
            }
            Ok(Err(err)) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            Ok(Err(err)) => Err(TransportError::Io(err)),
            Err(_elapsed) => Ok(None),
        }
    }

    /// Consume the port and return the underlying tokio socket.
    pub fn into_socket(self) -> UdpSocket {
        self.socket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    #[tokio::test]
    async fn async_send_and_receive() {
        let mut server = AsyncUdpPort::bind(loopback()).await.unwrap();
        let client = AsyncUdpPort::bind(loopback()).await.unwrap();

        client.send_to(b"ping", server.local_addr()).await.unwrap();

        let got = server
            .recv_timeout(Duration::from_secs(2))
            .await
            .unwrap()
            .expect("datagram should arrive");
        assert_eq!(got.payload.as_ref(), b"ping");
        assert_eq!(got.sender, client.local_addr());
    }

    #[tokio::test]
    async fn async_timeout_returns_none() {
        let mut port = AsyncUdpPort::bind(loopback()).await.unwrap();
        let got = port.recv_timeout(Duration::from_millis(20)).await.unwrap();
        assert!(got.is_none());
    }
}
