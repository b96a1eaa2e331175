//! UDP datagram port abstraction for DATAQ network instruments.
//!
//! Provides the one primitive the protocol layers need:
//! - broadcast a datagram to every host on the local segment
//! - send a datagram to one device
//! - receive at most one datagram, or report that the timeout expired
//!
//! This is the lowest layer of dqnet. The codec and session crates only
//! ever talk to the [`DatagramPort`] trait defined here.

pub mod error;
pub mod traits;
pub mod udp;

#[cfg(feature = "async")]
pub mod async_udp;

pub use error::{Result, TransportError};
pub use traits::{Datagram, DatagramPort};
pub use udp::{UdpPort, DEFAULT_RECV_BUFFER};

#[cfg(feature = "async")]
pub use async_udp::AsyncUdpPort;
