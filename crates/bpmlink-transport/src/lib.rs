//! Blocking byte-stream transports for BPM control clients.
//!
//! Provides one contract over two physically different channels:
//! - TCP stream sockets (FPGA board, RF front-end controller)
//! - RS-232 serial lines
//!
//! This is the lowest layer of bpmlink. The framing codec and everything above
//! it is written against the [`Transport`] trait only.

pub mod error;
pub mod io;
pub mod serial;
pub mod target;
pub mod tcp;
pub mod traits;

pub use error::{PartialTransfer, Result, TransportError};
pub use io::{read_all_counted, transfer, write_all_counted};
pub use serial::{SerialConfig, SerialTransport, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
pub use target::{connect, Target, TransportConfig};
pub use tcp::{TcpConfig, TcpTransport, DEFAULT_TCP_PORT};
pub use traits::{Transport, TransportKind};
