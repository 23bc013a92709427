use std::fs;

use bpmlink_frame::MAX_PAYLOAD;
use tracing::debug;

use crate::cmd::{parse_hex, SendArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    if payload.len() > MAX_PAYLOAD {
        return Err(CliError::usage(format!(
            "payload of {} bytes exceeds the {MAX_PAYLOAD}-byte limit",
            payload.len()
        )));
    }

    let mut framed = args.connect.open()?;
    debug!(command = args.command, size = payload.len(), "sending packet");
    let reply = framed
        .request_message(args.command, &payload)
        .map_err(|err| frame_error("request failed", err))?;

    print_packet(&reply, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return parse_hex(data).map_err(|err| CliError::usage(format!("--data: {err}")));
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}
