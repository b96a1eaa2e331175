//! Discover devices on the local segment and check an expected list.
//!
//! Run with:
//!   cargo run --example discover -- 192.168.1.50 192.168.1.51

use dqnet::session::{discover, reconcile, SessionConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let expected: Vec<String> = std::env::args().skip(1).collect();
    let config = SessionConfig::default();
    let mut port = config.open_port()?;

    let devices = discover(&mut port, &config)?;
    for device in &devices {
        println!(
            "{} {} serial={} group={} order={} {:?}",
            device.ip,
            device.model,
            device.serial_number,
            device.group_id,
            device.order_in_group,
            device.role
        );
    }

    if !expected.is_empty() {
        let result = reconcile(expected.iter().map(String::as_str), &devices);
        if !result.all_found {
            eprintln!("missing: {:?}", result.missing);
            std::process::exit(30);
        }
    }
    Ok(())
}
