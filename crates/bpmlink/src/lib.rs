//! Client-side plumbing for BPM and RF front-end control protocols.
//!
//! bpmlink moves request/response packets to a remote board over a TCP socket
//! or an RS-232 line, and drives tables of protocol operations against it.
//!
//! # Crate Structure
//!
//! - [`transport`]: blocking byte-stream backends (TCP, serial) behind one trait
//! - [`frame`]: 3-byte-header message framing and the packet boundary
//! - [`client`]: call dispatch tables and the cancellable telemetry poll loop

/// Re-export transport types.
pub mod transport {
    pub use bpmlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use bpmlink_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use bpmlink_client::*;
}
