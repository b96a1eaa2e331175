use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use dqnet_frame::{DEVICE_COMMAND_PORT, DEVICE_DISCOVERY_PORT};
use dqnet_transport::{UdpPort, DEFAULT_RECV_BUFFER};

/// Host port devices send discovery replies, status and data to.
pub const DEFAULT_HOST_PORT: u16 = 1234;

/// Addresses, ports and timeouts for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Local address to bind. Default: `0.0.0.0:1234`.
    pub bind_addr: SocketAddr,
    /// Device port for discovery broadcasts. Default: 1235.
    pub discovery_port: u16,
    /// Device port for commands. Default: 51235.
    pub command_port: u16,
    /// Quiet period that ends a discovery sweep. Default: 3 s.
    pub discovery_timeout: Duration,
    /// Per-read timeout for responses and stream data. Default: 3 s.
    pub read_timeout: Duration,
    /// Receive buffer size in bytes. Default: 2048.
    pub recv_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_HOST_PORT)),
            discovery_port: DEVICE_DISCOVERY_PORT,
            command_port: DEVICE_COMMAND_PORT,
            discovery_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(3),
            recv_buffer: DEFAULT_RECV_BUFFER,
        }
    }
}

impl SessionConfig {
    /// Bind a UDP port as configured.
    pub fn open_port(&self) -> dqnet_transport::Result<UdpPort> {
        UdpPort::bind_with_buffer(self.bind_addr, self.recv_buffer)
    }
}
