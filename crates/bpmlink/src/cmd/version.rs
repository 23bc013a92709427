use bpmlink_frame::{HEADER_SIZE, MAX_PAYLOAD};
use bpmlink_transport::{DEFAULT_BAUD_RATE, DEFAULT_TCP_PORT};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("bpmlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: bpmlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("BPMLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("frame: header={HEADER_SIZE} max_payload={MAX_PAYLOAD}");
    println!("defaults: tcp_port={DEFAULT_TCP_PORT} baud={DEFAULT_BAUD_RATE}");

    Ok(SUCCESS)
}
