//! Call dispatch and telemetry polling for BPM control clients.
//!
//! This is the layer an operator tool drives. Requested operations are armed
//! in [`DispatchTable`]s, executed in one fail-fast pass against a
//! [`Protocol`], and only then reported. Continuous telemetry runs through
//! [`PollLoop`] until its [`CancellationToken`] fires.

pub mod cancel;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod poll;
pub mod protocol;

pub use cancel::CancellationToken;
pub use descriptor::{
    CallDescriptor, DescriptorState, Operation, OperationKind, MAX_CURVE_SIZE, MAX_PARAM_SIZE,
};
pub use dispatch::{CallResult, DispatchPlan, DispatchTable, TableKind};
pub use error::{ClientError, Result};
pub use poll::{
    Pacer, PollConfig, PollLoop, PollSummary, Sample, SampleRing, ThreadPacer, MAX_RING_SIZE,
};
pub use protocol::{FunctionOutcome, PassthroughProtocol, Protocol};
