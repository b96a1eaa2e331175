//! Discovery, command and ADC streaming for DATAQ network instruments.
//!
//! DATAQ Ethernet data loggers speak a small UDP protocol: an ASCII
//! discovery broadcast, binary commands, and binary text/ADC responses
//! streamed back to the host.
//!
//! # Crate Structure
//!
//! - [`transport`]: UDP datagram port (blocking, plus tokio behind `async`)
//! - [`frame`]: wire codec, discovery parser and stream synchronization
//! - [`channels`]: station file and channel name/scale resolution
//! - [`session`]: discovery, command and streaming sessions (behind `session`)

/// Re-export transport types.
pub mod transport {
    pub use dqnet_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use dqnet_frame::*;
}

/// Re-export channel table types.
pub mod channels {
    pub use dqnet_channels::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use dqnet_session::*;
}
