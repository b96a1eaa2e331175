use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Magic number leading every command datagram.
pub const COMMAND_MAGIC: u32 = 0x3141_5926;

/// Command header: magic + group + code + three arguments, 4 bytes each.
pub const COMMAND_HEADER_SIZE: usize = 24;

/// Fixed UDP port devices listen on for commands.
pub const DEVICE_COMMAND_PORT: u16 = 51235;

/// The closed set of commands a device accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    SyncStart,
    SlaveIp,
    SyncStop,
    Connect,
    Disconnect,
    KeepAlive,
    Shared,
    SetWdqHeader,
}

impl CommandName {
    /// All commands in code order.
    pub const ALL: [CommandName; 8] = [
        CommandName::SyncStart,
        CommandName::SlaveIp,
        CommandName::SyncStop,
        CommandName::Connect,
        CommandName::Disconnect,
        CommandName::KeepAlive,
        CommandName::Shared,
        CommandName::SetWdqHeader,
    ];

    /// Wire code for this command.
    pub fn code(self) -> u32 {
        match self {
            CommandName::SyncStart => 1,
            CommandName::SlaveIp => 5,
            CommandName::SyncStop => 6,
            CommandName::Connect => 10,
            CommandName::Disconnect => 11,
            CommandName::KeepAlive => 12,
            CommandName::Shared => 13,
            CommandName::SetWdqHeader => 21,
        }
    }

    /// Look up a command by wire code.
    pub fn from_code(code: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.code() == code)
            .ok_or_else(|| FrameError::UnknownCommand(format!("code {code}")))
    }

    /// Canonical protocol name.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::SyncStart => "SyncStart",
            CommandName::SlaveIp => "SlaveIp",
            CommandName::SyncStop => "SyncStop",
            CommandName::Connect => "Connect",
            CommandName::Disconnect => "Disconnect",
            CommandName::KeepAlive => "KeepAlive",
            CommandName::Shared => "Shared",
            CommandName::SetWdqHeader => "SetWdqHeader",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandName {
    type Err = FrameError;

    /// Case-insensitive; `_` and `-` separators are ignored, so
    /// `SyncStart`, `sync_start` and `sync-start` all resolve.
    fn from_str(s: &str) -> Result<Self> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.as_str().to_ascii_lowercase() == folded)
            .ok_or_else(|| FrameError::UnknownCommand(s.to_string()))
    }
}

/// An outbound command datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    /// Application-assigned group; 0 addresses an idle device.
    pub group_id: u32,
    pub command: CommandName,
    pub args: [u32; 3],
    /// Payload bytes without the trailing NUL terminator.
    pub payload: Bytes,
}

impl CommandFrame {
    /// Create a command with zero arguments and an empty payload.
    pub fn new(group_id: u32, command: CommandName) -> Self {
        Self {
            group_id,
            command,
            args: [0; 3],
            payload: Bytes::new(),
        }
    }

    pub fn with_args(mut self, arg0: u32, arg1: u32, arg2: u32) -> Self {
        self.args = [arg0, arg1, arg2];
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Payload as text (lossy for non-UTF-8 bytes).
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// The total wire size of this command (header + payload + NUL).
    pub fn wire_size(&self) -> usize {
        COMMAND_HEADER_SIZE + self.payload.len() + 1
    }

    /// Append the wire form of this command to `dst`.
    ///
    /// Wire format (all integers little-endian):
    /// ```text
    /// ┌────────────┬──────────┬──────────┬────────┬────────┬────────┬──────────────┐
    /// │ Magic (4B) │ Group    │ Command  │ Arg0   │ Arg1   │ Arg2   │ Payload + 00 │
    /// │ 0x31415926 │ (4B)     │ (4B)     │ (4B)   │ (4B)   │ (4B)   │              │
    /// └────────────┴──────────┴──────────┴────────┴────────┴────────┴──────────────┘
    /// ```
    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_size());
        dst.put_u32_le(COMMAND_MAGIC);
        dst.put_u32_le(self.group_id);
        dst.put_u32_le(self.command.code());
        for arg in self.args {
            dst.put_u32_le(arg);
        }
        dst.put_slice(&self.payload);
        dst.put_u8(0);
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Parse a command datagram back into its fields.
    ///
    /// Exactly one trailing NUL is removed from the payload, mirroring
    /// [`CommandFrame::encode_into`].
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < COMMAND_HEADER_SIZE {
            return Err(FrameError::TruncatedHeader {
                kind: "command",
                len: src.len(),
                needed: COMMAND_HEADER_SIZE,
            });
        }

        let mut cursor = src;
        let magic = cursor.get_u32_le();
        if magic != COMMAND_MAGIC {
            return Err(FrameError::UnrecognizedFrameType {
                magic,
                len: src.len(),
            });
        }
        let group_id = cursor.get_u32_le();
        let command = CommandName::from_code(cursor.get_u32_le())?;
        let args = [
            cursor.get_u32_le(),
            cursor.get_u32_le(),
            cursor.get_u32_le(),
        ];
        let payload = cursor.strip_suffix(&[0]).unwrap_or(cursor);

        Ok(Self {
            group_id,
            command,
            args,
            payload: Bytes::copy_from_slice(payload),
        })
    }
}

/// Build the wire bytes for one command.
pub fn encode(
    group_id: u32,
    command: CommandName,
    arg0: u32,
    arg1: u32,
    arg2: u32,
    payload: &str,
) -> Bytes {
    CommandFrame::new(group_id, command)
        .with_args(arg0, arg1, arg2)
        .with_payload(Bytes::copy_from_slice(payload.as_bytes()))
        .to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_codes_match_protocol_table() {
        let table: Vec<(CommandName, u32)> =
            CommandName::ALL.iter().map(|c| (*c, c.code())).collect();
        assert_eq!(
            table,
            vec![
                (CommandName::SyncStart, 1),
                (CommandName::SlaveIp, 5),
                (CommandName::SyncStop, 6),
                (CommandName::Connect, 10),
                (CommandName::Disconnect, 11),
                (CommandName::KeepAlive, 12),
                (CommandName::Shared, 13),
                (CommandName::SetWdqHeader, 21),
            ]
        );
    }

    #[test]
    fn parses_names_loosely() {
        assert_eq!(
            "SyncStart".parse::<CommandName>().unwrap(),
            CommandName::SyncStart
        );
        assert_eq!(
            "sync_start".parse::<CommandName>().unwrap(),
            CommandName::SyncStart
        );
        assert_eq!(
            "set-wdq-header".parse::<CommandName>().unwrap(),
            CommandName::SetWdqHeader
        );
        assert_eq!(
            "KEEPALIVE".parse::<CommandName>().unwrap(),
            CommandName::KeepAlive
        );
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = "reboot".parse::<CommandName>().unwrap_err();
        assert!(matches!(err, FrameError::UnknownCommand(name) if name == "reboot"));
        assert!(CommandName::from_code(2).is_err());
    }

    #[test]
    fn encode_layout() {
        let bytes = encode(7, CommandName::Connect, 1, 2, 3, "ab");

        let mut expected = Vec::new();
        expected.extend_from_slice(&0x3141_5926u32.to_le_bytes());
        expected.extend_from_slice(&7u32.to_le_bytes());
        expected.extend_from_slice(&10u32.to_le_bytes());
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(&3u32.to_le_bytes());
        expected.extend_from_slice(b"ab\0");

        assert_eq!(bytes.as_ref(), expected.as_slice());
    }

    #[test]
    fn empty_payload_still_terminated() {
        let bytes = encode(0, CommandName::KeepAlive, 0, 0, 0, "");
        assert_eq!(bytes.len(), COMMAND_HEADER_SIZE + 1);
        assert_eq!(bytes[COMMAND_HEADER_SIZE], 0);
    }

    #[test]
    fn existing_nul_gets_one_more() {
        let bytes = encode(0, CommandName::SlaveIp, 0, 0, 0, "x\0");
        assert_eq!(&bytes[COMMAND_HEADER_SIZE..], b"x\0\0");
    }

    #[test]
    fn decode_recovers_header_and_payload() {
        let payloads = ["", "hdr text", "192.168.1.51", "x"];
        for (i, command) in CommandName::ALL.into_iter().enumerate() {
            let n = i as u32;
            let group = n * 7;
            let args = [n, u32::MAX - n, n << 16];
            let payload = payloads[i % payloads.len()];

            let bytes = encode(group, command, args[0], args[1], args[2], payload);
            assert_eq!(bytes.len(), COMMAND_HEADER_SIZE + payload.len() + 1);
            let frame = CommandFrame::decode(&bytes).unwrap();

            assert_eq!(frame.group_id, group, "{command}");
            assert_eq!(frame.command, command);
            assert_eq!(frame.args, args, "{command}");
            assert_eq!(frame.payload_text(), payload, "{command}");
        }
    }

    #[test]
    fn decode_keeps_caller_nul() {
        let bytes = encode(0, CommandName::Shared, 0, 0, 0, "x\0");
        let frame = CommandFrame::decode(&bytes).unwrap();
        assert_eq!(frame.payload.as_ref(), b"x\0");
    }

    #[test]
    fn decode_rejects_foreign_magic() {
        let mut bytes = encode(0, CommandName::Connect, 0, 0, 0, "").to_vec();
        bytes[0] = 0;
        let err = CommandFrame::decode(&bytes).unwrap_err();
        assert!(matches!(err, FrameError::UnrecognizedFrameType { .. }));
    }

    #[test]
    fn decode_rejects_short_header() {
        let err = CommandFrame::decode(&[0x26, 0x59, 0x41, 0x31, 0]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::TruncatedHeader {
                len: 5,
                needed: COMMAND_HEADER_SIZE,
                ..
            }
        ));
    }

    #[test]
    fn wire_size_matches_encoding() {
        let frame = CommandFrame::new(1, CommandName::SyncStart).with_payload("go");
        assert_eq!(frame.wire_size(), frame.to_bytes().len());
    }
}
