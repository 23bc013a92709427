mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "bpmlink", version, about = "BPM / RF front-end control client")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "warn",
        env = "BPMLINK_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "bpmlink",
            "send",
            "--target",
            "tcp://10.0.18.90:8080",
            "--command",
            "0x10",
            "--data",
            "0001",
        ])
        .expect("send args should parse");

        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.command, 0x10);
        assert_eq!(
            args.connect.target,
            bpmlink_transport::Target::Tcp {
                host: "10.0.18.90".to_string(),
                port: 8080
            }
        );
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "bpmlink",
            "send",
            "-t",
            "localhost",
            "-c",
            "1",
            "--data",
            "00",
            "--file",
            "/tmp/payload.bin",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn serial_target_and_baud() {
        let cli = Cli::try_parse_from([
            "bpmlink",
            "call",
            "--target",
            "/dev/ttyUSB0",
            "--baud",
            "115200",
            "--get-var",
            "2",
        ])
        .expect("call args should parse");

        let Command::Call(args) = cli.command else {
            panic!("expected call");
        };
        assert_eq!(args.connect.transport_config().serial.baud_rate, 115200);
        assert!(matches!(
            args.connect.target,
            bpmlink_transport::Target::Serial { .. }
        ));
    }

    #[test]
    fn monitor_needs_exactly_one_source() {
        let err = Cli::try_parse_from(["bpmlink", "monitor", "-t", "localhost"])
            .expect_err("missing source should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let err = Cli::try_parse_from([
            "bpmlink", "monitor", "-t", "localhost", "--func", "1", "--var", "2",
        ])
        .expect_err("two sources should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn monitor_count_must_be_positive() {
        let err = Cli::try_parse_from([
            "bpmlink", "monitor", "-t", "localhost", "--var", "2", "--count", "0",
        ])
        .expect_err("zero count should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let cli = Cli::try_parse_from([
            "bpmlink", "monitor", "-t", "localhost", "--var", "2", "--count", "1",
        ])
        .expect("count of one should parse");
        match cli.command {
            Command::Monitor(args) => assert_eq!(args.count, Some(1)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_target() {
        let err = Cli::try_parse_from(["bpmlink", "call", "--target", "host:notaport"])
            .expect_err("bad port should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
