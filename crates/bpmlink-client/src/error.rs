/// Errors that can occur while dispatching or polling operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Frame-level error (includes transport failures).
    #[error("frame error: {0}")]
    Frame(#[from] bpmlink_frame::FrameError),

    /// The device answered with a non-zero error code.
    #[error("{operation} returned error code {code:#04x}")]
    Invocation { operation: String, code: u8 },

    /// A call failed; wraps the cause with the operation's name.
    #[error("{operation} failed: {source}")]
    Call {
        operation: String,
        #[source]
        source: Box<ClientError>,
    },

    /// A curve buffer could not be allocated.
    #[error("{operation}: cannot allocate {bytes} bytes for curve data")]
    Allocation { operation: String, bytes: usize },

    /// A parameter buffer exceeds the protocol limit.
    #[error("{operation}: {size}-byte parameter exceeds the {max}-byte limit")]
    ParamTooLarge {
        operation: String,
        size: usize,
        max: usize,
    },

    /// Armed input does not match the operation's input size.
    #[error("{operation}: expected {expected} input bytes, got {actual}")]
    InputSize {
        operation: String,
        expected: usize,
        actual: usize,
    },

    /// The device answered with more bytes than the output buffer holds.
    #[error("response of {size} bytes does not fit the {capacity}-byte output buffer")]
    ResponseTooLarge { size: usize, capacity: usize },

    /// No descriptor with that name exists in the table.
    #[error("unknown operation {0:?}")]
    UnknownOperation(String),

    /// A descriptor with that name is already in the table.
    #[error("duplicate operation {0:?}")]
    DuplicateOperation(String),

    /// The descriptor has already been executed in this run.
    #[error("{0} already executed in this run")]
    AlreadyExecuted(String),

    /// The descriptor was never armed.
    #[error("{0} is not armed")]
    NotArmed(String),

    /// Results were requested before the execute pass completed.
    #[error("results requested before every armed operation succeeded")]
    NotExecuted,

    /// The operation cannot be polled.
    #[error("{0} cannot be polled")]
    NotPollable(String),

    /// The output sink rejected a sample.
    #[error("output sink failed: {0}")]
    Sink(#[source] std::io::Error),
}

impl ClientError {
    /// Wrap `self` with the name of the operation that produced it, unless it
    /// already names one.
    pub fn in_operation(self, operation: &str) -> Self {
        match self {
            err @ (ClientError::Invocation { .. }
            | ClientError::Call { .. }
            | ClientError::Allocation { .. }
            | ClientError::ParamTooLarge { .. }
            | ClientError::InputSize { .. }
            | ClientError::AlreadyExecuted(_)
            | ClientError::NotArmed(_)
            | ClientError::NotPollable(_)) => err,
            other => ClientError::Call {
                operation: operation.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost frame error, if this failure came from the channel.
    pub fn frame_error(&self) -> Option<&bpmlink_frame::FrameError> {
        match self {
            ClientError::Frame(err) => Some(err),
            ClientError::Call { source, .. } => source.frame_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
