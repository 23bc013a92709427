use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::serial::{SerialConfig, SerialTransport};
use crate::tcp::{TcpConfig, TcpTransport, DEFAULT_TCP_PORT};
use crate::traits::Transport;

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A TCP endpoint, by host name or address literal.
    Tcp { host: String, port: u16 },
    /// A serial device path.
    Serial { path: PathBuf },
}

/// Per-backend configuration handed to [`connect`].
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    pub tcp: TcpConfig,
    pub serial: SerialConfig,
}

/// Open the backend `target` names.
///
/// This is the only place that looks at the transport kind; callers get a
/// boxed [`Transport`] and stay backend-agnostic from here on.
pub fn connect(target: &Target, config: &TransportConfig) -> Result<Box<dyn Transport>> {
    debug!(%target, "connecting");
    match target {
        Target::Tcp { host, port } => Ok(Box::new(TcpTransport::connect(host, *port, &config.tcp)?)),
        Target::Serial { path } => Ok(Box::new(SerialTransport::open(path, &config.serial)?)),
    }
}

impl FromStr for Target {
    type Err = TransportError;

    /// Accepted forms: `tcp://host[:port]`, `host[:port]`, `[v6addr][:port]`,
    /// `serial://<path>`, or a bare absolute device path.
    fn from_str(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TransportError::InvalidTarget(input.to_string()));
        }

        if let Some(path) = input.strip_prefix("serial://") {
            if path.is_empty() {
                return Err(TransportError::InvalidTarget(input.to_string()));
            }
            return Ok(Target::Serial {
                path: PathBuf::from(path),
            });
        }
        if input.starts_with('/') {
            return Ok(Target::Serial {
                path: PathBuf::from(input),
            });
        }

        let rest = input.strip_prefix("tcp://").unwrap_or(input);
        parse_host_port(rest).ok_or_else(|| TransportError::InvalidTarget(input.to_string()))
    }
}

fn parse_host_port(input: &str) -> Option<Target> {
    if let Some(bracketed) = input.strip_prefix('[') {
        let (host, tail) = bracketed.split_once(']')?;
        let port = match tail {
            "" => DEFAULT_TCP_PORT,
            _ => tail.strip_prefix(':')?.parse().ok()?,
        };
        return tcp(host, port);
    }

    match input.matches(':').count() {
        0 => tcp(input, DEFAULT_TCP_PORT),
        1 => {
            let (host, port) = input.split_once(':')?;
            tcp(host, port.parse().ok()?)
        }
        // Unbracketed IPv6 literal.
        _ => tcp(input, DEFAULT_TCP_PORT),
    }
}

fn tcp(host: &str, port: u16) -> Option<Target> {
    if host.is_empty() {
        return None;
    }
    Some(Target::Tcp {
        host: host.to_string(),
        port,
    })
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Tcp { host, port } if host.contains(':') => write!(f, "tcp://[{host}]:{port}"),
            Target::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Target::Serial { path } => write!(f, "serial://{}", path.display()),
        }
    }
}
