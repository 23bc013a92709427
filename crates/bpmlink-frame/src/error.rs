use bpmlink_transport::TransportError;

/// Errors that can occur while sending or receiving framed messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer than a full header arrived.
    #[error("short header ({received} of {expected} bytes): {source}")]
    ShortHeader {
        expected: usize,
        received: usize,
        source: TransportError,
    },

    /// The header was read but fewer payload bytes than it declared arrived.
    #[error("short payload ({received} of {expected} bytes): {source}")]
    ShortPayload {
        expected: usize,
        received: usize,
        source: TransportError,
    },

    /// The transport accepted only part of an outgoing packet.
    #[error("short write ({sent} of {requested} bytes): {source}")]
    ShortWrite {
        sent: usize,
        requested: usize,
        source: TransportError,
    },

    /// A message exceeds the configured maximum size.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// An outgoing packet is too short to carry a header.
    #[error("packet of {len} bytes is shorter than the {header}-byte header")]
    Truncated { len: usize, header: usize },

    /// A buffer's length disagrees with the length its header declares.
    #[error("header declares {declared} payload bytes, buffer holds {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// The caller's receive buffer cannot hold the incoming message.
    #[error("receive buffer too small ({capacity} bytes, need {needed})")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// A previous framing failure left the stream at an unknown position.
    #[error("stream desynchronized by an earlier framing failure; reconnect")]
    Desynchronized,

    /// A transport error outside of a framed transfer.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl FrameError {
    /// Whether the failure came from the channel rather than from a size or
    /// format check.
    pub fn is_communication(&self) -> bool {
        matches!(
            self,
            FrameError::ShortHeader { .. }
                | FrameError::ShortPayload { .. }
                | FrameError::ShortWrite { .. }
                | FrameError::Transport(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
