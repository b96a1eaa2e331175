//! Start a synchronized capture and print scaled samples on tokio.
//!
//! Drives the datagram codec through `UdpFramed`: sends `SyncStart` to
//! every device in the station file, prints `COUNT` ADC blocks, then sends
//! `SyncStop`.
//!
//! Run with:
//!   cargo run --example async-stream --features async -- station.json 20
//!
//! Pair with `cargo run --example fake-device` and a station file whose
//! device points at 127.0.0.1.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use dqnet::channels::{ChannelResolver, StationConfig};
use dqnet::frame::{
    CommandFrame, CommandName, DqCodec, ResponseFrame, SyncState, DEVICE_COMMAND_PORT,
};
use dqnet::session::DEFAULT_HOST_PORT;
use dqnet::transport::AsyncUdpPort;
use futures_util::{SinkExt, StreamExt};
use tokio_util::udp::UdpFramed;

const GROUP_ID: u32 = 1;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let station_path = PathBuf::from(args.next().ok_or("usage: async-stream STATION [COUNT]")?);
    let count: usize = args.next().as_deref().unwrap_or("10").parse()?;

    let station = StationConfig::from_file(&station_path)?;
    let resolver = ChannelResolver::from_station(&station)?;

    let bind = SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_HOST_PORT));
    let port = AsyncUdpPort::bind(bind).await?;
    eprintln!("Listening on {}", port.local_addr());
    let mut framed = UdpFramed::new(port.into_socket(), DqCodec);

    for ip in resolver.device_ips() {
        let start = CommandFrame::new(GROUP_ID, CommandName::SyncStart);
        framed.send((start, SocketAddr::new(ip, DEVICE_COMMAND_PORT))).await?;
    }

    let mut sync = SyncState::new();
    let mut printed = 0usize;
    while printed < count {
        let next = tokio::time::timeout(Duration::from_secs(3), framed.next()).await;
        let Ok(Some(received)) = next else {
            eprintln!("no data for 3s, stopping");
            break;
        };
        let (frame, sender) = received?;
        match frame {
            ResponseFrame::AdcData(block) => {
                let samples = resolver.scale_frame(sender.ip(), &block.samples)?;
                if let Some(event) = sync.observe(sender.ip(), &block) {
                    eprintln!("{} resync: gap of {} samples", event.device, event.gap());
                }
                let line: Vec<String> = samples
                    .iter()
                    .map(|s| format!("{}={:.4}", s.channel, s.value))
                    .collect();
                println!("{} #{} {}", sender.ip(), block.cumulative_count, line.join(" "));
                printed += 1;
            }
            ResponseFrame::Text(reply) => eprintln!("{}: {}", sender.ip(), reply.text()),
        }
    }

    for ip in resolver.device_ips() {
        let stop = CommandFrame::new(GROUP_ID, CommandName::SyncStop);
        framed.send((stop, SocketAddr::new(ip, DEVICE_COMMAND_PORT))).await?;
    }
    Ok(())
}
