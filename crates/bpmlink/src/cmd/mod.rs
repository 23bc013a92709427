use std::path::PathBuf;
use std::time::Duration;

use bpmlink_client::{CallDescriptor, MAX_PARAM_SIZE};
use bpmlink_frame::FramedTransport;
use bpmlink_transport::{
    SerialConfig, Target, TcpConfig, Transport, TransportConfig, DEFAULT_BAUD_RATE,
};
use clap::{Args, Subcommand};

use crate::exit::{transport_error, CliResult};
use crate::output::OutputFormat;

pub mod call;
pub mod monitor;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one raw packet and print the response.
    Send(SendArgs),
    /// Run functions, variable reads/writes and curve reads, then report.
    Call(CallArgs),
    /// Poll one telemetry operation until interrupted.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Call(args) => call::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where the device is and how to reach it.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Device address: tcp://host[:port], host[:port], serial://PATH or a /dev path.
    #[arg(long, short = 't', env = "BPMLINK_TARGET", value_name = "TARGET")]
    pub target: Target,
    /// Serial line rate in bits per second.
    #[arg(long, env = "BPMLINK_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Per-address TCP connect timeout (e.g. 5s, 500ms). Default: none.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub connect_timeout: Option<Duration>,
}

impl ConnectArgs {
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            tcp: TcpConfig {
                connect_timeout: self.connect_timeout,
            },
            serial: SerialConfig {
                baud_rate: self.baud,
                ..SerialConfig::default()
            },
        }
    }

    pub fn open(&self) -> CliResult<FramedTransport<Box<dyn Transport>>> {
        let transport = bpmlink_transport::connect(&self.target, &self.transport_config())
            .map_err(|err| transport_error(&format!("connect to {} failed", self.target), err))?;
        Ok(FramedTransport::new(transport))
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Command byte (header byte 0), decimal or 0x-prefixed hex.
    #[arg(long, short = 'c', value_name = "BYTE", value_parser = parse_id)]
    pub command: u8,
    /// Payload as hex.
    #[arg(long, value_name = "HEX", conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the payload from a file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Run a function, with optional hex input. Repeatable.
    #[arg(long = "func", value_name = "ID[:HEX]", value_parser = FuncArg::parse)]
    pub funcs: Vec<FuncArg>,
    /// Read a variable of SIZE bytes (default 128). Repeatable.
    #[arg(long = "get-var", value_name = "ID[:SIZE]", value_parser = VarRead::parse)]
    pub get_vars: Vec<VarRead>,
    /// Write a hex value to a variable. Repeatable.
    #[arg(long = "set-var", value_name = "ID:HEX", value_parser = VarWrite::parse)]
    pub set_vars: Vec<VarWrite>,
    /// Read a curve of BLOCKS blocks of BLOCK_SIZE bytes. Repeatable.
    #[arg(long = "curve", value_name = "ID:BLOCKS:BLOCK_SIZE", value_parser = CurveArg::parse)]
    pub curves: Vec<CurveArg>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    #[command(flatten)]
    pub source: TelemetrySource,
    /// Pause between samples (e.g. 100ms, 1s).
    #[arg(long, value_name = "DURATION", default_value = "100ms", value_parser = parse_duration)]
    pub interval: Duration,
    /// Number of sample slots kept in the ring.
    #[arg(long, default_value_t = 16)]
    pub slots: usize,
    /// Stop after N samples instead of waiting for Ctrl-C.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: Option<u64>,
}

/// The one operation `monitor` polls.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct TelemetrySource {
    /// Poll a function, with optional hex input.
    #[arg(long = "func", value_name = "ID[:HEX]", value_parser = FuncArg::parse)]
    pub func: Option<FuncArg>,
    /// Poll a variable of SIZE bytes (default 128).
    #[arg(long = "var", value_name = "ID[:SIZE]", value_parser = VarRead::parse)]
    pub var: Option<VarRead>,
    /// Poll a curve.
    #[arg(long = "curve", value_name = "ID:BLOCKS:BLOCK_SIZE", value_parser = CurveArg::parse)]
    pub curve: Option<CurveArg>,
}

impl TelemetrySource {
    /// The descriptor to poll and the input to arm it with.
    pub fn descriptor(&self) -> bpmlink_client::Result<(CallDescriptor, Vec<u8>)> {
        match (&self.func, &self.var, &self.curve) {
            (Some(func), _, _) => Ok((func.descriptor()?, func.input.clone())),
            (None, Some(var), _) => Ok((var.descriptor()?, Vec::new())),
            (None, None, Some(curve)) => Ok((curve.descriptor()?, Vec::new())),
            (None, None, None) => Err(bpmlink_client::ClientError::UnknownOperation(
                "no telemetry operation given".to_string(),
            )),
        }
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// `--func ID[:HEX]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncArg {
    pub id: u8,
    pub input: Vec<u8>,
}

impl FuncArg {
    fn parse(input: &str) -> Result<Self, String> {
        let (id, data) = match input.split_once(':') {
            Some((id, data)) => (parse_id(id)?, parse_hex(data)?),
            None => (parse_id(input)?, Vec::new()),
        };
        Ok(Self { id, input: data })
    }

    pub fn descriptor(&self) -> bpmlink_client::Result<CallDescriptor> {
        CallDescriptor::function(
            format!("func {:#04x}", self.id),
            self.id,
            self.input.len(),
            MAX_PARAM_SIZE,
        )
    }
}

/// `--get-var ID[:SIZE]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRead {
    pub id: u8,
    pub size: usize,
}

impl VarRead {
    fn parse(input: &str) -> Result<Self, String> {
        let (id, size) = match input.split_once(':') {
            Some((id, size)) => (parse_id(id)?, parse_count(size)?),
            None => (parse_id(input)?, MAX_PARAM_SIZE),
        };
        Ok(Self { id, size })
    }

    pub fn descriptor(&self) -> bpmlink_client::Result<CallDescriptor> {
        CallDescriptor::read_variable(format!("get-var {:#04x}", self.id), self.id, self.size)
    }
}

/// `--set-var ID:HEX`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarWrite {
    pub id: u8,
    pub value: Vec<u8>,
}

impl VarWrite {
    fn parse(input: &str) -> Result<Self, String> {
        let (id, value) = input
            .split_once(':')
            .ok_or_else(|| format!("expected ID:HEX, got {input:?}"))?;
        Ok(Self {
            id: parse_id(id)?,
            value: parse_hex(value)?,
        })
    }

    pub fn descriptor(&self) -> bpmlink_client::Result<CallDescriptor> {
        CallDescriptor::write_variable(
            format!("set-var {:#04x}", self.id),
            self.id,
            self.value.len(),
        )
    }
}

/// `--curve ID:BLOCKS:BLOCK_SIZE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveArg {
    pub id: u8,
    pub blocks: u16,
    pub block_size: usize,
}

impl CurveArg {
    fn parse(input: &str) -> Result<Self, String> {
        let mut parts = input.split(':');
        let (Some(id), Some(blocks), Some(block_size), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("expected ID:BLOCKS:BLOCK_SIZE, got {input:?}"));
        };
        let blocks = parse_count(blocks)?;
        Ok(Self {
            id: parse_id(id)?,
            blocks: u16::try_from(blocks).map_err(|_| format!("too many blocks: {blocks}"))?,
            block_size: parse_count(block_size)?,
        })
    }

    pub fn descriptor(&self) -> bpmlink_client::Result<CallDescriptor> {
        CallDescriptor::curve(
            format!("curve {:#04x}", self.id),
            self.id,
            self.blocks,
            self.block_size,
        )
    }
}

/// Operation id or command byte: decimal or 0x-prefixed hex.
fn parse_id(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("invalid id {input:?} (expected 0-255 or 0x00-0xff)"))
}

fn parse_count(input: &str) -> Result<usize, String> {
    input
        .trim()
        .parse()
        .map_err(|_| format!("invalid count {input:?}"))
}

/// Hex bytes, optionally 0x-prefixed; an empty string is no bytes.
pub(crate) fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let input = input.trim();
    let input = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    hex::decode(input).map_err(|err| format!("invalid hex {input:?}: {err}"))
}

pub(crate) fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
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
        .map_err(|_| format!("invalid duration value: {input}"))?;
    if value == 0 {
        return Err("duration must be greater than zero".to_string());
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
