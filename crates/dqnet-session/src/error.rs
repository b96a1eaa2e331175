use std::net::SocketAddr;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] dqnet_transport::TransportError),

    /// A datagram from a device failed to decode.
    #[error("bad datagram from {sender}: {source}")]
    Decode {
        sender: SocketAddr,
        source: dqnet_frame::FrameError,
    },

    /// Channel table error.
    #[error("channel error: {0}")]
    Channel(#[from] dqnet_channels::ChannelError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
