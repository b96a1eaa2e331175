//! Session orchestration for DATAQ network instruments.
//!
//! Ties the datagram port, the codec and the channel table together:
//! discover devices, send commands, and turn an ADC stream into named,
//! scaled samples while tracking per-device synchronization.
//!
//! Everything is generic over [`DatagramPort`](dqnet_transport::DatagramPort)
//! and runs on the caller's thread.

pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod receive;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

pub use command::CommandClient;
pub use config::{SessionConfig, DEFAULT_HOST_PORT};
pub use discovery::{discover, reconcile, Reconciliation};
pub use error::{Result, SessionError};
pub use receive::collect_messages;
pub use stream::{StreamEvent, StreamSession, StreamStats};
