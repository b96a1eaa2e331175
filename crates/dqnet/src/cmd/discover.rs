use dqnet_session::{discover, reconcile, SessionConfig};
use tracing::warn;

use crate::cmd::{parse_duration, DiscoverArgs};
use crate::exit::{session_error, transport_error, CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_devices, OutputFormat};

pub fn run(args: DiscoverArgs, config: SessionConfig, format: OutputFormat) -> CliResult<i32> {
    let config = SessionConfig {
        discovery_timeout: parse_duration(&args.timeout)?,
        discovery_port: args.port,
        ..config
    };
    let mut port = config
        .open_port()
        .map_err(|err| transport_error("bind failed", err))?;

    let devices =
        discover(&mut port, &config).map_err(|err| session_error("discovery failed", err))?;

    if args.expect.is_empty() {
        print_devices(&devices, None, format);
        return Ok(SUCCESS);
    }

    let result = reconcile(args.expect.iter().map(String::as_str), &devices);
    print_devices(&devices, Some(&result), format);
    if result.all_found {
        Ok(SUCCESS)
    } else {
        warn!(missing = ?result.missing, "expected devices did not answer");
        Ok(HEALTH_CHECK_FAILED)
    }
}
