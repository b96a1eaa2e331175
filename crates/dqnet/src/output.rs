use std::io::IsTerminal;
use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use dqnet_channels::ScaledSample;
use dqnet_frame::{DeviceRecord, DeviceRole, ResyncEvent, TextResponse};
use dqnet_session::Reconciliation;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct DiscoveryOutput<'a> {
    devices: &'a [DeviceRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    reconciliation: Option<&'a Reconciliation>,
    timestamp: String,
}

pub fn print_devices(
    devices: &[DeviceRecord],
    reconciliation: Option<&Reconciliation>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = DiscoveryOutput {
                devices,
                reconciliation,
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "IP", "MAC", "MODEL", "SERIAL", "REV", "GROUP", "ORDER", "ROLE", "ADC",
                    "DESCRIPTION",
                ]);
            for device in devices {
                table.add_row(vec![
                    device.ip.clone(),
                    device.mac.clone(),
                    device.model.clone(),
                    device.serial_number.clone(),
                    device.software_rev.clone(),
                    device.group_id.to_string(),
                    device.order_in_group.to_string(),
                    role_name(device.role).to_string(),
                    on_off(device.adc_running).to_string(),
                    device.description.clone(),
                ]);
            }
            println!("{table}");
            if let Some(result) = reconciliation {
                print_missing(result);
            }
        }
        OutputFormat::Pretty => {
            for device in devices {
                println!(
                    "{} mac={} model={} serial={} group={} order={} role={} adc={}",
                    device.ip,
                    device.mac,
                    device.model,
                    device.serial_number,
                    device.group_id,
                    device.order_in_group,
                    role_name(device.role),
                    on_off(device.adc_running)
                );
            }
            if let Some(result) = reconciliation {
                print_missing(result);
            }
        }
    }
}

fn print_missing(result: &Reconciliation) {
    for ip in &result.missing {
        println!("missing: {ip}");
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    device: IpAddr,
    group_id: u32,
    order: u32,
    text: &'a str,
}

pub fn print_reply(device: IpAddr, reply: &TextResponse, format: OutputFormat) {
    let text = reply.text();
    match format {
        OutputFormat::Json => print_json(&ReplyOutput {
            device,
            group_id: reply.group_id,
            order: reply.order,
            text: &text,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "GROUP", "ORDER", "TEXT"])
                .add_row(vec![
                    device.to_string(),
                    reply.group_id.to_string(),
                    reply.order.to_string(),
                    text.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{device}: {text}"),
    }
}

/// One decoded ADC block ready for printing.
pub struct SampleBlock<'a> {
    pub device: IpAddr,
    pub group_id: u32,
    pub order: u32,
    pub cumulative_count: u32,
    pub samples: &'a [ScaledSample],
    pub resync: Option<&'a ResyncEvent>,
}

#[derive(Serialize)]
struct ResyncOutput {
    expected: u32,
    reported: u32,
    gap: i64,
}

#[derive(Serialize)]
struct SampleOutput<'a> {
    channel: &'a str,
    index: u8,
    raw: i16,
    value: f64,
}

#[derive(Serialize)]
struct BlockOutput<'a> {
    device: IpAddr,
    group_id: u32,
    order: u32,
    cumulative_count: u32,
    resync: Option<ResyncOutput>,
    samples: Vec<SampleOutput<'a>>,
    timestamp: String,
}

pub fn print_samples(block: &SampleBlock<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = BlockOutput {
                device: block.device,
                group_id: block.group_id,
                order: block.order,
                cumulative_count: block.cumulative_count,
                resync: block.resync.map(|event| ResyncOutput {
                    expected: event.expected,
                    reported: event.reported,
                    gap: event.gap(),
                }),
                samples: block
                    .samples
                    .iter()
                    .map(|s| SampleOutput {
                        channel: &s.channel,
                        index: s.index,
                        raw: s.raw,
                        value: s.value,
                    })
                    .collect(),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "CHANNEL", "INDEX", "RAW", "VALUE"]);
            for sample in block.samples {
                table.add_row(vec![
                    block.device.to_string(),
                    sample.channel.clone(),
                    sample.index.to_string(),
                    sample.raw.to_string(),
                    format!("{:.4}", sample.value),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if let Some(event) = block.resync {
                println!(
                    "{} resync expected={} reported={}",
                    block.device, event.expected, event.reported
                );
            }
            let line: Vec<String> = block
                .samples
                .iter()
                .map(|s| format!("{}={:.4}", s.channel, s.value))
                .collect();
            println!("{} #{} {}", block.device, block.cumulative_count, line.join(" "));
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn role_name(role: DeviceRole) -> &'static str {
    match role {
        DeviceRole::Master => "master",
        DeviceRole::Slave => "slave",
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "running"
    } else {
        "idle"
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
