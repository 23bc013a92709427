use std::io;

use bpmlink_client::{
    CancellationToken, ClientError, DispatchTable, PassthroughProtocol, PollConfig, PollLoop,
    TableKind, ThreadPacer,
};
use bpmlink_frame::FramedTransport;
use bpmlink_transport::Transport;
use tracing::info;

use crate::cmd::{ConnectArgs, MonitorArgs};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, INTERRUPTED, SUCCESS};
use crate::output::{write_sample, OutputFormat};

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let (descriptor, input) = args
        .source
        .descriptor()
        .map_err(|err| client_error("invalid operation", err))?;
    let name = descriptor.name().to_string();

    let mut telemetry = DispatchTable::new(TableKind::Telemetry);
    telemetry
        .push(descriptor)
        .and_then(|()| telemetry.arm(&name, &input))
        .map_err(|err| client_error("invalid operation", err))?;
    let descriptor = telemetry
        .get(&name)
        .ok_or_else(|| CliError::new(INTERNAL, format!("{name} missing from telemetry table")))?;

    let cancel = CancellationToken::new();
    let framed = open_interruptible(&args.connect, &cancel)?;
    let mut protocol = PassthroughProtocol::new(framed);
    let config = PollConfig {
        interval: args.interval,
        ring_slots: args.slots,
    };
    let poll = PollLoop::new(config, cancel.clone());

    let limit = args.count;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = poll.run(
        &mut protocol,
        descriptor,
        &mut ThreadPacer::default(),
        |sample| {
            write_sample(&mut out, sample, format)?;
            if limit.is_some_and(|n| sample.seq + 1 >= n) {
                cancel.cancel();
            }
            Ok(())
        },
    );

    let summary = match result {
        Ok(summary) => summary,
        // Reader went away (e.g. `| head`): a normal way to stop.
        Err(ClientError::Sink(err)) if err.kind() == io::ErrorKind::BrokenPipe => {
            return Ok(SUCCESS)
        }
        Err(err) => return Err(client_error("monitor failed", err)),
    };

    info!(operation = %name, samples = summary.samples, "monitor stopped");
    if limit.is_some_and(|n| summary.samples >= n) {
        Ok(SUCCESS)
    } else {
        Ok(INTERRUPTED)
    }
}

/// Connect, then route Ctrl-C to `cancel`. Until the transport is open,
/// Ctrl-C keeps its default action and ends the process.
fn open_interruptible(
    connect: &ConnectArgs,
    cancel: &CancellationToken,
) -> CliResult<FramedTransport<Box<dyn Transport>>> {
    let framed = connect.open()?;
    install_ctrlc_handler(cancel.clone())?;
    Ok(framed)
}

fn install_ctrlc_handler(cancel: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || cancel.cancel()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;
    use crate::exit::TRANSPORT_ERROR;

    #[test]
    fn failed_connect_leaves_ctrlc_alone() {
        let target = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let connect = ConnectArgs {
            target: target.parse().unwrap(),
            baud: 9600,
            connect_timeout: None,
        };

        let Err(err) = open_interruptible(&connect, &CancellationToken::new()) else {
            panic!("connect to {target} should be refused");
        };

        assert_eq!(err.code, TRANSPORT_ERROR);
        // No handler was registered, so this process can still take one.
        assert!(ctrlc::set_handler(|| {}).is_ok());
    }
}
