use std::net::IpAddr;

use crate::error::{FrameError, Result};

/// Token broadcast to ask every device on the segment to identify itself.
pub const DISCOVERY_TOKEN: &[u8] = b"dataq_instruments";

/// Fixed UDP port devices listen on for discovery broadcasts.
pub const DEVICE_DISCOVERY_PORT: u16 = 1235;

const FIELD_COUNT: usize = 12;

/// Whether a device leads or follows its synchronization group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DeviceRole {
    Master,
    Slave,
}

/// Identity of one device, taken from a single discovery reply.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceRecord {
    /// Dotted-quad address as reported by the device.
    pub ip: String,
    /// Colon-separated MAC address as reported by the device.
    pub mac: String,
    pub software_rev: String,
    pub model: String,
    pub adc_running: bool,
    pub description: String,
    pub serial_number: String,
    pub group_id: u32,
    pub order_in_group: u32,
    pub role: DeviceRole,
}

impl DeviceRecord {
    /// Parsed IP address, or `None` when an octet is out of range.
    pub fn ip_addr(&self) -> Option<IpAddr> {
        self.ip.parse().ok()
    }
}

/// Parse a discovery reply datagram.
pub fn parse_discovery_datagram(raw: &[u8]) -> Result<DeviceRecord> {
    let text = std::str::from_utf8(raw).map_err(|err| {
        FrameError::malformed_reply(
            format!("not ASCII: {err}"),
            &String::from_utf8_lossy(raw),
        )
    })?;
    parse_discovery_reply(text)
}

/// Parse the plaintext reply a device sends to the discovery broadcast.
///
/// The reply is one line of exactly twelve space-separated fields:
/// ```text
/// IP MAC SOFTWARE_REV MODEL ADC_RUNNING RESERVED DESC_LEN DESCRIPTION SERIAL GROUP ORDER MASTER
/// ```
/// Surrounding whitespace and NUL padding are ignored. Any missing,
/// extra or ill-formed field rejects the whole reply.
pub fn parse_discovery_reply(raw: &str) -> Result<DeviceRecord> {
    let line = raw.trim_matches(|c: char| c == '\0' || c.is_ascii_whitespace());
    let fields: Vec<&str> = line.split_ascii_whitespace().collect();
    if fields.len() != FIELD_COUNT {
        return Err(FrameError::malformed_reply(
            format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
            raw,
        ));
    }

    let ip = fields[0];
    if !is_dotted_quad(ip) {
        return Err(FrameError::malformed_reply("bad IP address field", raw));
    }
    let mac = fields[1];
    if !is_mac(mac) {
        return Err(FrameError::malformed_reply("bad MAC address field", raw));
    }

    for (index, name) in [
        (2, "software revision"),
        (3, "model"),
        (5, "reserved"),
        (7, "description"),
        (8, "serial number"),
    ] {
        if !is_word(fields[index]) {
            return Err(FrameError::malformed_reply(format!("bad {name} field"), raw));
        }
    }

    let adc_running = number::<u32>(fields[4], "ADC running", raw)? != 0;
    number::<u32>(fields[6], "description length", raw)?;
    let group_id = number::<u32>(fields[9], "group id", raw)?;
    let order_in_group = number::<u32>(fields[10], "order in group", raw)?;
    let role = match fields[11] {
        "1" => DeviceRole::Master,
        "0" => DeviceRole::Slave,
        _ => return Err(FrameError::malformed_reply("bad master/slave field", raw)),
    };

    Ok(DeviceRecord {
        ip: ip.to_string(),
        mac: mac.to_string(),
        software_rev: fields[2].to_string(),
        model: fields[3].to_string(),
        adc_running,
        description: fields[7].to_string(),
        serial_number: fields[8].to_string(),
        group_id,
        order_in_group,
        role,
    })
}

fn number<T: std::str::FromStr>(field: &str, name: &str, raw: &str) -> Result<T> {
    if !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FrameError::malformed_reply(format!("bad {name} field"), raw));
    }
    field
        .parse()
        .map_err(|_| FrameError::malformed_reply(format!("bad {name} field"), raw))
}

fn is_word(field: &str) -> bool {
    field.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Four groups of 1-3 digits. Octet ranges are not checked.
fn is_dotted_quad(field: &str) -> bool {
    let groups: Vec<&str> = field.split('.').collect();
    groups.len() == 4
        && groups
            .iter()
            .all(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Six groups of two hex digits.
fn is_mac(field: &str) -> bool {
    let groups: Vec<&str> = field.split(':').collect();
    groups.len() == 6
        && groups
            .iter()
            .all(|g| g.len() == 2 && g.bytes().all(|b| b.is_ascii_hexdigit()))
}
