use std::fmt;
use std::io;

use bpmlink_client::ClientError;
use bpmlink_frame::FrameError;
use bpmlink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const FRAMING_ERROR: i32 = 4;
pub const INVOCATION_FAILED: i32 = 5;
pub const PERMISSION_DENIED: i32 = 50;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;
pub const INTERRUPTED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(err.kind(), FAILURE), format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    CliError::new(transport_code(&err), format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    CliError::new(frame_code(&err), format!("{context}: {err}"))
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    CliError::new(client_code(&err), format!("{context}: {err}"))
}

fn io_code(kind: io::ErrorKind, fallback: i32) -> i32 {
    match kind {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => fallback,
    }
}

fn transport_code(err: &TransportError) -> i32 {
    match err {
        TransportError::Resolve { source, .. }
        | TransportError::NoReachableAddress { source, .. }
        | TransportError::Configure { source, .. }
        | TransportError::Io(source) => io_code(source.kind(), TRANSPORT_ERROR),
        TransportError::Partial(partial) => io_code(partial.source.kind(), TRANSPORT_ERROR),
        TransportError::Open { source, .. } => match source.kind {
            serialport::ErrorKind::Io(kind) => io_code(kind, TRANSPORT_ERROR),
            _ => TRANSPORT_ERROR,
        },
        TransportError::InvalidTarget(_) => USAGE,
    }
}

fn frame_code(err: &FrameError) -> i32 {
    match err {
        FrameError::Transport(err) => transport_code(err),
        FrameError::ShortHeader { source, .. }
        | FrameError::ShortPayload { source, .. }
        | FrameError::ShortWrite { source, .. } => match transport_code(source) {
            TIMEOUT => TIMEOUT,
            _ => FRAMING_ERROR,
        },
        _ => FRAMING_ERROR,
    }
}

fn client_code(err: &ClientError) -> i32 {
    match err {
        ClientError::Frame(err) => frame_code(err),
        ClientError::Call { source, .. } => client_code(source),
        ClientError::Invocation { .. } => INVOCATION_FAILED,
        ClientError::ResponseTooLarge { .. } => FRAMING_ERROR,
        ClientError::ParamTooLarge { .. }
        | ClientError::InputSize { .. }
        | ClientError::UnknownOperation(_)
        | ClientError::DuplicateOperation(_)
        | ClientError::NotPollable(_) => USAGE,
        ClientError::Allocation { .. } => FAILURE,
        ClientError::Sink(err) => io_code(err.kind(), FAILURE),
        ClientError::AlreadyExecuted(_) | ClientError::NotArmed(_) | ClientError::NotExecuted => {
            INTERNAL
        }
    }
}

#[cfg(test)]
mod tests {
    use bpmlink_transport::PartialTransfer;

    use super::*;

    fn partial(kind: io::ErrorKind) -> TransportError {
        TransportError::Partial(PartialTransfer {
            transferred: 1,
            requested: 3,
            source: io::Error::from(kind),
        })
    }

    #[test]
    fn serial_idle_timeout_maps_to_timeout() {
        let err = FrameError::ShortHeader {
            expected: 3,
            received: 1,
            source: partial(io::ErrorKind::TimedOut),
        };
        assert_eq!(frame_error("recv", err).code, TIMEOUT);
    }

    #[test]
    fn peer_close_mid_message_is_a_framing_error() {
        let err = FrameError::ShortPayload {
            expected: 10,
            received: 4,
            source: partial(io::ErrorKind::UnexpectedEof),
        };
        assert_eq!(frame_error("recv", err).code, FRAMING_ERROR);
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        let err = TransportError::NoReachableAddress {
            target: "127.0.0.1:8080".to_string(),
            attempts: 1,
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        let cli = transport_error("connect failed", err);
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.starts_with("connect failed: no reachable address"));
    }

    #[test]
    fn wrapped_invocation_keeps_its_code() {
        let err = ClientError::Invocation {
            operation: "func 0x10".to_string(),
            code: 0xE3,
        }
        .in_operation("ignored");
        assert_eq!(client_error("call failed", err).code, INVOCATION_FAILED);

        let err = ClientError::Frame(FrameError::Desynchronized).in_operation("get-var 0x02");
        let cli = client_error("call failed", err);
        assert_eq!(cli.code, FRAMING_ERROR);
        assert!(cli.message.contains("get-var 0x02"));
    }
}
