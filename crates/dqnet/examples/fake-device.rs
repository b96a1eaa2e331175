//! Simulated DATAQ device for trying the CLI without hardware.
//!
//! Answers discovery on 1235, acknowledges commands on 51235 and streams
//! an 8-channel ramp to whoever sent `SyncStart` until `SyncStop`.
//!
//! Run with:
//!   cargo run --example fake-device
//!
//! In another terminal:
//!   cargo run --features cli -- discover --timeout 1s
//!   cargo run --features cli -- send 127.0.0.1 SyncStart --wait

use std::net::{Ipv4Addr, SocketAddr};
use std::thread;
use std::time::Duration;

use dqnet::frame::{
    CommandFrame, CommandName, ADC_DATA_MAGIC, DEVICE_COMMAND_PORT, DEVICE_DISCOVERY_PORT,
    DISCOVERY_TOKEN, TEXT_MAGIC,
};
use dqnet::transport::{DatagramPort, UdpPort};

const SAMPLES_PER_BLOCK: usize = 64;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut discovery = UdpPort::bind(SocketAddr::from((
        Ipv4Addr::UNSPECIFIED,
        DEVICE_DISCOVERY_PORT,
    )))?;
    thread::spawn(move || loop {
        match discovery.recv_timeout(Duration::from_secs(1)) {
            Ok(Some(datagram)) if &datagram.payload[..] == DISCOVERY_TOKEN => {
                let reply = "127.0.0.1 02:00:00:00:00:01 1_00 DI4108E 0 0 4 fake 0001 0 0 1";
                if let Err(err) = discovery.send_to(reply.as_bytes(), datagram.sender) {
                    eprintln!("discovery reply failed: {err}");
                }
            }
            Ok(_) => {}
            Err(err) => {
                eprintln!("discovery socket failed: {err}");
                break;
            }
        }
    });

    let mut port = UdpPort::bind(SocketAddr::from((
        Ipv4Addr::UNSPECIFIED,
        DEVICE_COMMAND_PORT,
    )))?;
    eprintln!("Listening for commands on {}", port.local_addr());

    let mut streaming_to: Option<SocketAddr> = None;
    let mut group_id = 0u32;
    let mut cumulative = 0u32;

    loop {
        if let Some(datagram) = port.recv_timeout(Duration::from_millis(20))? {
            match CommandFrame::decode(&datagram.payload) {
                Ok(command) => {
                    eprintln!("{} from {}", command.command, datagram.sender);
                    group_id = command.group_id;
                    match command.command {
                        CommandName::SyncStart => {
                            streaming_to = Some(datagram.sender);
                            cumulative = 0;
                        }
                        CommandName::SyncStop | CommandName::Disconnect => streaming_to = None,
                        _ => {}
                    }
                    let ack = format!("{} ok\r", command.command);
                    port.send_to(&text_frame(group_id, ack.as_bytes()), datagram.sender)?;
                }
                Err(err) => eprintln!("ignoring datagram from {}: {err}", datagram.sender),
            }
        }

        if let Some(host) = streaming_to {
            let samples: Vec<i16> = (0..SAMPLES_PER_BLOCK)
                .map(|i| ramp(cumulative.wrapping_add(i as u32)))
                .collect();
            port.send_to(&adc_frame(group_id, cumulative, &samples), host)?;
            cumulative = cumulative.wrapping_add(SAMPLES_PER_BLOCK as u32);
        }
    }
}

fn ramp(n: u32) -> i16 {
    ((n / 8) % 65536) as u16 as i16
}

fn text_frame(group_id: u32, text: &[u8]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(16 + text.len() + 1);
    raw.extend_from_slice(&TEXT_MAGIC.to_le_bytes());
    raw.extend_from_slice(&group_id.to_le_bytes());
    raw.extend_from_slice(&0u32.to_le_bytes());
    raw.extend_from_slice(&(text.len() as u32 + 1).to_le_bytes());
    raw.extend_from_slice(text);
    raw.push(0);
    raw
}

fn adc_frame(group_id: u32, cumulative: u32, samples: &[i16]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(20 + samples.len() * 2);
    raw.extend_from_slice(&ADC_DATA_MAGIC.to_le_bytes());
    raw.extend_from_slice(&group_id.to_le_bytes());
    raw.extend_from_slice(&0u32.to_le_bytes());
    raw.extend_from_slice(&cumulative.to_le_bytes());
    raw.extend_from_slice(&(samples.len() as u32).to_le_bytes());
    for sample in samples {
        raw.extend_from_slice(&sample.to_le_bytes());
    }
    raw
}
