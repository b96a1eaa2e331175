use std::net::SocketAddr;

/// Errors that can occur on a datagram port.
///
/// A receive timeout is deliberately absent: it is the normal end of a
/// drain loop and is reported as `Ok(None)` by
/// [`DatagramPort::recv_timeout`](crate::DatagramPort::recv_timeout).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the local endpoint.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to send a datagram.
    #[error("failed to send {len} bytes to {addr}: {source}")]
    Send {
        addr: SocketAddr,
        len: usize,
        source: std::io::Error,
    },

    /// The OS accepted fewer bytes than the datagram holds.
    #[error("short send to {addr} ({sent} of {len} bytes)")]
    ShortSend {
        addr: SocketAddr,
        sent: usize,
        len: usize,
    },

    /// An I/O error occurred on the socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A zero timeout was requested; the OS treats it as "block forever".
    #[error("receive timeout must be greater than zero")]
    ZeroTimeout,
}

pub type Result<T> = std::result::Result<T, TransportError>;
