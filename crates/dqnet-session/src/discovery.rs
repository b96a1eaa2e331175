use std::collections::BTreeSet;
use std::net::IpAddr;

use dqnet_frame::{parse_discovery_datagram, DeviceRecord, DISCOVERY_TOKEN};
use dqnet_transport::DatagramPort;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::Result;

/// Broadcast the discovery token and gather every well-formed reply.
///
/// Reads until `config.discovery_timeout` passes with no new datagram.
/// Malformed replies are logged and dropped. A device answering twice is
/// kept once, first reply wins.
pub fn discover<P: DatagramPort>(
    mut port: P,
    config: &SessionConfig,
) -> Result<Vec<DeviceRecord>> {
    port.broadcast(DISCOVERY_TOKEN, config.discovery_port)?;
    debug!(port = config.discovery_port, "discovery broadcast sent");

    let mut devices: Vec<DeviceRecord> = Vec::new();
    while let Some(datagram) = port.recv_timeout(config.discovery_timeout)? {
        match parse_discovery_datagram(&datagram.payload) {
            Ok(record) => {
                if devices.iter().any(|known| known.ip == record.ip) {
                    debug!(ip = %record.ip, "duplicate discovery reply ignored");
                    continue;
                }
                info!(
                    ip = %record.ip,
                    model = %record.model,
                    serial = %record.serial_number,
                    "device discovered"
                );
                devices.push(record);
            }
            Err(err) => {
                warn!(sender = %datagram.sender, error = %err, "dropping discovery reply");
            }
        }
    }

    info!(count = devices.len(), "discovery finished");
    Ok(devices)
}

/// Outcome of checking discovered devices against an expected list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub all_found: bool,
    /// Expected addresses with no discovery reply.
    pub missing: BTreeSet<String>,
    /// Discovered addresses nobody asked for.
    pub unexpected: BTreeSet<String>,
}

/// Compare expected device addresses with discovery results.
///
/// Addresses that parse as IPs are compared in canonical form, so
/// `192.168.001.050` matches `192.168.1.50`. Anything else is compared
/// as trimmed text.
pub fn reconcile<'a, I>(expected: I, discovered: &[DeviceRecord]) -> Reconciliation
where
    I: IntoIterator<Item = &'a str>,
{
    let expected: BTreeSet<String> = expected.into_iter().map(canonical).collect();
    let found: BTreeSet<String> = discovered.iter().map(|r| canonical(&r.ip)).collect();

    let missing: BTreeSet<String> = expected.difference(&found).cloned().collect();
    let unexpected = found.difference(&expected).cloned().collect();
    Reconciliation {
        all_found: missing.is_empty(),
        missing,
        unexpected,
    }
}

fn canonical(address: &str) -> String {
    let trimmed = address.trim();
    match trimmed.parse::<IpAddr>() {
        Ok(ip) => ip.to_string(),
        Err(_) => canonical_dotted(trimmed).unwrap_or_else(|| trimmed.to_string()),
    }
}

/// Strip leading zeros from dotted-quad octets (`std` rejects them).
fn canonical_dotted(address: &str) -> Option<String> {
    let octets: Vec<u8> = address
        .split('.')
        .map(|octet| octet.parse::<u8>().ok())
        .collect::<Option<_>>()?;
    let octets: [u8; 4] = octets.try_into().ok()?;
    Some(IpAddr::from(octets).to_string())
}
