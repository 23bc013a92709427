use std::path::PathBuf;

/// A reliable transfer that stopped before moving the requested byte count.
#[derive(Debug, thiserror::Error)]
#[error("transferred {transferred} of {requested} bytes: {source}")]
pub struct PartialTransfer {
    /// Bytes actually moved before the failure.
    pub transferred: usize,
    /// Bytes the caller asked for.
    pub requested: usize,
    /// The error reported by the underlying read/write primitive.
    pub source: std::io::Error,
}

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Name resolution for a TCP target failed.
    #[error("failed to resolve {target}: {source}")]
    Resolve {
        target: String,
        source: std::io::Error,
    },

    /// Every resolved candidate address refused or failed the connection.
    #[error("no reachable address for {target} ({attempts} tried): {source}")]
    NoReachableAddress {
        target: String,
        attempts: usize,
        source: std::io::Error,
    },

    /// Connected, but the socket could not be configured.
    #[error("failed to configure socket for {target}: {source}")]
    Configure {
        target: String,
        source: std::io::Error,
    },

    /// The serial device could not be opened or configured.
    #[error("failed to open serial device {path}: {source}")]
    Open {
        path: PathBuf,
        source: serialport::Error,
    },

    /// A transfer stopped short of the requested length.
    #[error("partial transfer: {0}")]
    Partial(#[from] PartialTransfer),

    /// The target string could not be parsed.
    #[error("invalid target {0:?}")]
    InvalidTarget(String),

    /// An I/O error occurred on the transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether this error happened while establishing the channel rather than on
    /// an already connected one.
    pub fn is_establishment(&self) -> bool {
        matches!(
            self,
            TransportError::Resolve { .. }
                | TransportError::NoReachableAddress { .. }
                | TransportError::Configure { .. }
                | TransportError::Open { .. }
                | TransportError::InvalidTarget(_)
        )
    }

    /// Number of bytes moved before the failure, for partial transfers.
    pub fn transferred(&self) -> Option<usize> {
        match self {
            TransportError::Partial(partial) => Some(partial.transferred),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
