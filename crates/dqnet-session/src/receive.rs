use std::time::Duration;

use dqnet_transport::{Datagram, DatagramPort};
use tracing::debug;

use crate::error::Result;

/// Drain raw datagrams until `timeout` passes with no traffic or
/// `expected_count` have arrived.
///
/// Payloads are returned undecoded; callers pick the parser that fits
/// what they asked the devices for.
pub fn collect_messages<P: DatagramPort>(
    mut port: P,
    timeout: Duration,
    expected_count: Option<usize>,
) -> Result<Vec<Datagram>> {
    let mut messages = Vec::new();
    loop {
        if expected_count.is_some_and(|n| messages.len() >= n) {
            break;
        }
        match port.recv_timeout(timeout)? {
            Some(datagram) => {
                debug!(sender = %datagram.sender, len = datagram.payload.len(), "message received");
                messages.push(datagram);
            }
            None => break,
        }
    }
    Ok(messages)
}
