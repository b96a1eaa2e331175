use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use dqnet_session::SessionConfig;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod discover;
pub mod send;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Broadcast for devices and list the replies.
    Discover(DiscoverArgs),
    /// Send a single command to a device.
    Send(SendArgs),
    /// Decode and print an ADC stream using a station file.
    Stream(StreamArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, bind: SocketAddr, format: OutputFormat) -> CliResult<i32> {
    let config = SessionConfig {
        bind_addr: bind,
        ..SessionConfig::default()
    };
    match command {
        Command::Discover(args) => discover::run(args, config, format),
        Command::Send(args) => send::run(args, config, format),
        Command::Stream(args) => stream::run(args, config, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Quiet period that ends discovery (e.g. 3s, 500ms).
    #[arg(long, default_value = "3s")]
    pub timeout: String,
    /// Device addresses that must answer (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub expect: Vec<String>,
    /// Device discovery port.
    #[arg(long, default_value_t = dqnet_frame::DEVICE_DISCOVERY_PORT)]
    pub port: u16,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Device IP address.
    pub device: IpAddr,
    /// Command name (e.g. SyncStart, sync-start, keepalive).
    pub command: String,
    /// Group id.
    #[arg(long, default_value_t = 0)]
    pub group: u32,
    #[arg(long, default_value_t = 0)]
    pub arg0: u32,
    #[arg(long, default_value_t = 0)]
    pub arg1: u32,
    #[arg(long, default_value_t = 0)]
    pub arg2: u32,
    /// Text payload (NUL-terminated on the wire).
    #[arg(long, default_value = "")]
    pub payload: String,
    /// Device command port.
    #[arg(long, default_value_t = dqnet_frame::DEVICE_COMMAND_PORT)]
    pub port: u16,
    /// Wait for one text reply from the device and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for the reply when --wait is set (e.g. 3s, 500ms).
    #[arg(long, default_value = "3s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Station file (JSON) naming devices and channels.
    pub config: PathBuf,
    /// Exit after N ADC blocks.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit when no data arrives for this long (e.g. 3s). Default: wait forever.
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
