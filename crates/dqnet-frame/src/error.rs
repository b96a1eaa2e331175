/// Errors that can occur during encoding/decoding.
///
/// Every variant is fatal for the datagram it was raised on. Stream
/// discontinuities are not errors; see [`ResyncEvent`](crate::ResyncEvent).
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The first four bytes match none of the known magic numbers.
    #[error("unrecognized frame type (magic 0x{magic:08x}, {len} bytes)")]
    UnrecognizedFrameType { magic: u32, len: usize },

    /// The datagram ends before its fixed header does.
    #[error("truncated {kind} header ({len} bytes, need {needed})")]
    TruncatedHeader {
        kind: &'static str,
        len: usize,
        needed: usize,
    },

    /// The trailing region disagrees with the length carried in the header.
    #[error(
        "{kind} payload length mismatch (magic 0x{magic:08x}, header declares {declared} bytes, found {actual})"
    )]
    PayloadLengthMismatch {
        kind: &'static str,
        magic: u32,
        declared: usize,
        actual: usize,
    },

    /// A discovery reply does not have the 12-field layout.
    #[error("malformed discovery reply ({reason}): {reply:?}")]
    MalformedDiscoveryReply { reason: String, reply: String },

    /// The command name or code is not part of the protocol.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// An I/O error surfaced through the tokio codec.
    #[cfg(feature = "async")]
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    pub(crate) fn malformed_reply(reason: impl Into<String>, reply: &str) -> Self {
        Self::MalformedDiscoveryReply {
            reason: reason.into(),
            reply: reply.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
