use dqnet_frame::{CommandFrame, CommandName};
use dqnet_session::{CommandClient, SessionConfig};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{
    frame_error, session_error, transport_error, CliError, CliResult, SUCCESS, TIMEOUT,
};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: SendArgs, config: SessionConfig, format: OutputFormat) -> CliResult<i32> {
    let frame = build_frame(&args)?;
    let wait_timeout = parse_duration(&args.wait_timeout)?;

    let port = config
        .open_port()
        .map_err(|err| transport_error("bind failed", err))?;
    let mut client = CommandClient::new(port, &config)
        .with_command_port(args.port)
        .with_read_timeout(wait_timeout);

    if !args.wait {
        client
            .send(args.device, &frame)
            .map_err(|err| session_error("send failed", err))?;
        return Ok(SUCCESS);
    }

    match client
        .send_and_wait(args.device, &frame)
        .map_err(|err| session_error("send failed", err))?
    {
        Some(reply) => {
            print_reply(args.device, &reply, format);
            Ok(SUCCESS)
        }
        None => Err(CliError::new(
            TIMEOUT,
            format!("no reply from {} within {}", args.device, args.wait_timeout),
        )),
    }
}

fn build_frame(args: &SendArgs) -> CliResult<CommandFrame> {
    let command: CommandName = args
        .command
        .parse()
        .map_err(|err| frame_error("invalid command", err))?;
    Ok(CommandFrame::new(args.group, command)
        .with_args(args.arg0, args.arg1, args.arg2)
        .with_payload(args.payload.clone().into_bytes()))
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use super::*;
    use crate::exit::USAGE;

    fn args(command: &str) -> SendArgs {
        SendArgs {
            device: IpAddr::from([192, 168, 1, 50]),
            command: command.to_string(),
            group: 4,
            arg0: 1,
            arg1: 0,
            arg2: 9,
            payload: "x".to_string(),
            port: dqnet_frame::DEVICE_COMMAND_PORT,
            wait: false,
            wait_timeout: "3s".to_string(),
        }
    }

    #[test]
    fn builds_frame_from_loose_command_name() {
        let frame = build_frame(&args("sync-start")).unwrap();
        assert_eq!(frame.command, CommandName::SyncStart);
        assert_eq!(frame.group_id, 4);
        assert_eq!(frame.args, [1, 0, 9]);
        assert_eq!(&frame.payload[..], b"x");
    }

    #[test]
    fn unknown_command_is_usage_error() {
        let err = build_frame(&args("reboot")).unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
