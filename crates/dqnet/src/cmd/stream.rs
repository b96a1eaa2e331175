use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dqnet_channels::{ChannelResolver, StationConfig};
use dqnet_session::{SessionConfig, StreamEvent, StreamSession};
use tracing::info;

use crate::cmd::{parse_duration, StreamArgs};
use crate::exit::{
    channel_error, session_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT,
};
use crate::output::{print_reply, print_samples, OutputFormat, SampleBlock};

/// Poll interval used to notice Ctrl-C when no `--timeout` is given.
const IDLE_POLL: Duration = Duration::from_millis(500);

pub fn run(args: StreamArgs, config: SessionConfig, format: OutputFormat) -> CliResult<i32> {
    let idle_limit = args.timeout.as_deref().map(parse_duration).transpose()?;

    let station =
        StationConfig::from_file(&args.config).map_err(|err| channel_error("config", err))?;
    let resolver =
        ChannelResolver::from_station(&station).map_err(|err| channel_error("config", err))?;
    info!(
        devices = resolver.device_ips().len(),
        channels = resolver.len(),
        "station loaded"
    );

    let port = config
        .open_port()
        .map_err(|err| transport_error("bind failed", err))?;
    let mut session = StreamSession::new(port, resolver, &config)
        .with_read_timeout(idle_limit.unwrap_or(IDLE_POLL));

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut blocks = 0usize;
    let outcome = loop {
        if !running.load(Ordering::SeqCst) {
            break Ok(SUCCESS);
        }
        if args.count.is_some_and(|count| blocks >= count) {
            break Ok(SUCCESS);
        }

        let event = match session.poll() {
            Ok(event) => event,
            Err(err) => break Err(session_error("stream failed", err)),
        };
        match event {
            StreamEvent::Samples {
                device,
                group_id,
                order,
                cumulative_count,
                samples,
                resync,
            } => {
                print_samples(
                    &SampleBlock {
                        device,
                        group_id,
                        order,
                        cumulative_count,
                        samples: &samples,
                        resync: resync.as_ref(),
                    },
                    format,
                );
                blocks = blocks.saturating_add(1);
            }
            StreamEvent::Text { device, response } => print_reply(device, &response, format),
            StreamEvent::Idle => {
                // A quiet period after data is the normal end of a capture.
                if let Some(limit) = idle_limit {
                    if blocks > 0 {
                        break Ok(SUCCESS);
                    }
                    break Err(CliError::new(
                        TIMEOUT,
                        format!("no data for {}ms", limit.as_millis()),
                    ));
                }
            }
        }
    };

    let stats = session.stats();
    info!(
        frames = stats.frames,
        samples = stats.samples,
        resyncs = stats.resyncs,
        text_responses = stats.text_responses,
        "stream finished"
    );
    outcome
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
