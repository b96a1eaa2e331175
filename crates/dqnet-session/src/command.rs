use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use dqnet_frame::{decode_frame, CommandFrame, CommandName, ResponseFrame, TextResponse};
use dqnet_transport::DatagramPort;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// Sends commands to devices and optionally waits for their text reply.
#[derive(Debug)]
pub struct CommandClient<P> {
    port: P,
    command_port: u16,
    read_timeout: Duration,
}

impl<P: DatagramPort> CommandClient<P> {
    pub fn new(port: P, config: &SessionConfig) -> Self {
        Self {
            port,
            command_port: config.command_port,
            read_timeout: config.read_timeout,
        }
    }

    /// Override the device command port (default 51235).
    pub fn with_command_port(mut self, port: u16) -> Self {
        self.command_port = port;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_inner(self) -> P {
        self.port
    }

    /// Encode and send one command.
    pub fn send(&mut self, device: IpAddr, frame: &CommandFrame) -> Result<()> {
        let dest = SocketAddr::new(device, self.command_port);
        self.port.send_to(&frame.to_bytes(), dest)?;
        info!(
            %dest,
            command = %frame.command,
            group = frame.group_id,
            "command sent"
        );
        Ok(())
    }

    /// Build and send a command from its parts.
    pub fn send_command(
        &mut self,
        device: IpAddr,
        group_id: u32,
        command: CommandName,
        args: [u32; 3],
        payload: &str,
    ) -> Result<()> {
        let frame = CommandFrame::new(group_id, command)
            .with_args(args[0], args[1], args[2])
            .with_payload(payload.as_bytes().to_vec());
        self.send(device, &frame)
    }

    /// Send a command, then wait up to the read timeout for a text reply
    /// from the same device.
    ///
    /// Traffic from other hosts and ADC blocks are skipped. A datagram
    /// from `device` that fails to decode is an error.
    pub fn send_and_wait(
        &mut self,
        device: IpAddr,
        frame: &CommandFrame,
    ) -> Result<Option<TextResponse>> {
        self.send(device, frame)?;

        let deadline = Instant::now() + self.read_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(%device, "no reply before deadline");
                return Ok(None);
            }
            let Some(datagram) = self.port.recv_timeout(remaining)? else {
                return Ok(None);
            };
            if datagram.sender.ip() != device {
                debug!(sender = %datagram.sender, "skipping datagram from another host");
                continue;
            }
            match decode_frame(&datagram.payload) {
                Ok(ResponseFrame::Text(reply)) => return Ok(Some(reply)),
                Ok(ResponseFrame::AdcData(_)) => {
                    debug!(%device, "skipping adc block while awaiting reply");
                }
                Err(source) => {
                    return Err(SessionError::Decode {
                        sender: datagram.sender,
                        source,
                    })
                }
            }
        }
    }
}
