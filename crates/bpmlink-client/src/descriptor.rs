use bpmlink_frame::MAX_PAYLOAD;
use serde::Serialize;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::protocol::Protocol;

/// Largest input or output parameter of a single call.
pub const MAX_PARAM_SIZE: usize = 128;

/// Largest curve a single call may assemble in memory.
pub const MAX_CURVE_SIZE: usize = 256 * 1024 * 1024;

/// The protocol operation a descriptor is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// An immediate function call.
    Function { id: u8 },
    /// Read a front-end variable.
    ReadVariable { id: u8 },
    /// Write a front-end variable.
    WriteVariable { id: u8 },
    /// A block-structured curve read in `blocks` requests of `block_size`.
    Curve {
        id: u8,
        blocks: u16,
        block_size: usize,
    },
}

/// [`Operation`] without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Function,
    ReadVariable,
    WriteVariable,
    Curve,
}

impl Operation {
    pub fn id(&self) -> u8 {
        match *self {
            Operation::Function { id }
            | Operation::ReadVariable { id }
            | Operation::WriteVariable { id }
            | Operation::Curve { id, .. } => id,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Function { .. } => OperationKind::Function,
            Operation::ReadVariable { .. } => OperationKind::ReadVariable,
            Operation::WriteVariable { .. } => OperationKind::WriteVariable,
            Operation::Curve { .. } => OperationKind::Curve,
        }
    }
}

/// Lifecycle of a descriptor within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorState {
    /// Not requested this run.
    Unarmed,
    /// Requested, input filled, waiting for dispatch.
    Armed,
    /// Dispatched successfully; output is valid.
    Executed,
}

/// One protocol operation plus its parameter buffers.
///
/// Input and output buffers have a fixed size chosen at construction. Curve
/// output is allocated when the curve is executed.
#[derive(Debug, Clone)]
pub struct CallDescriptor {
    name: String,
    operation: Operation,
    state: DescriptorState,
    input: Vec<u8>,
    output: Vec<u8>,
    output_len: usize,
}

impl CallDescriptor {
    /// An immediate function taking `input_size` bytes and producing up to
    /// `output_size` bytes.
    pub fn function(
        name: impl Into<String>,
        id: u8,
        input_size: usize,
        output_size: usize,
    ) -> Result<Self> {
        Self::with_buffers(name.into(), Operation::Function { id }, input_size, output_size)
    }

    /// A readable variable of `size` bytes.
    pub fn read_variable(name: impl Into<String>, id: u8, size: usize) -> Result<Self> {
        Self::with_buffers(name.into(), Operation::ReadVariable { id }, 0, size)
    }

    /// A writable variable of `size` bytes.
    pub fn write_variable(name: impl Into<String>, id: u8, size: usize) -> Result<Self> {
        Self::with_buffers(name.into(), Operation::WriteVariable { id }, size, 0)
    }

    /// A curve of `blocks` blocks, each up to `block_size` bytes.
    pub fn curve(name: impl Into<String>, id: u8, blocks: u16, block_size: usize) -> Result<Self> {
        let name = name.into();
        if block_size > MAX_PAYLOAD {
            return Err(ClientError::ParamTooLarge {
                operation: name,
                size: block_size,
                max: MAX_PAYLOAD,
            });
        }
        Ok(Self {
            name,
            operation: Operation::Curve {
                id,
                blocks,
                block_size,
            },
            state: DescriptorState::Unarmed,
            input: Vec::new(),
            output: Vec::new(),
            output_len: 0,
        })
    }

    fn with_buffers(
        name: String,
        operation: Operation,
        input_size: usize,
        output_size: usize,
    ) -> Result<Self> {
        for size in [input_size, output_size] {
            if size > MAX_PARAM_SIZE {
                return Err(ClientError::ParamTooLarge {
                    operation: name,
                    size,
                    max: MAX_PARAM_SIZE,
                });
            }
        }
        Ok(Self {
            name,
            operation,
            state: DescriptorState::Unarmed,
            input: vec![0u8; input_size],
            output: vec![0u8; output_size],
            output_len: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn state(&self) -> DescriptorState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == DescriptorState::Armed
    }

    /// Input size fixed at construction.
    pub fn input_size(&self) -> usize {
        self.input.len()
    }

    pub fn input(&self) -> &[u8] {
        &self.input
    }

    /// Output produced by the last execution.
    pub fn output(&self) -> &[u8] {
        &self.output[..self.output_len]
    }

    /// Request this operation with `input` for the current run.
    pub fn arm(&mut self, input: &[u8]) -> Result<()> {
        if self.state == DescriptorState::Executed {
            return Err(ClientError::AlreadyExecuted(self.name.clone()));
        }
        if input.len() != self.input.len() {
            return Err(ClientError::InputSize {
                operation: self.name.clone(),
                expected: self.input.len(),
                actual: input.len(),
            });
        }
        self.input.copy_from_slice(input);
        self.state = DescriptorState::Armed;
        debug!(operation = %self.name, "armed");
        Ok(())
    }

    /// Dispatch once. Only an armed descriptor may execute, and only once.
    pub(crate) fn execute<P: Protocol + ?Sized>(&mut self, protocol: &mut P) -> Result<()> {
        match self.state {
            DescriptorState::Unarmed => return Err(ClientError::NotArmed(self.name.clone())),
            DescriptorState::Executed => {
                return Err(ClientError::AlreadyExecuted(self.name.clone()))
            }
            DescriptorState::Armed => {}
        }

        self.output_len = self
            .invoke(protocol)
            .map_err(|err| err.in_operation(&self.name))?;
        self.state = DescriptorState::Executed;
        Ok(())
    }

    /// Buffer size one telemetry sample needs. Curves are held to
    /// [`MAX_CURVE_SIZE`] exactly as on the execute path.
    pub(crate) fn sample_size(&self) -> Result<usize> {
        match self.operation {
            Operation::Curve {
                blocks, block_size, ..
            } => curve_size(&self.name, blocks, block_size),
            _ => Ok(self.output.len()),
        }
    }

    /// Read one telemetry sample into `slot` without touching the run state.
    pub(crate) fn sample<P: Protocol + ?Sized>(
        &self,
        protocol: &mut P,
        slot: &mut [u8],
    ) -> Result<usize> {
        if let Operation::WriteVariable { .. } = self.operation {
            return Err(ClientError::NotPollable(self.name.clone()));
        }
        self.read_sample(protocol, slot)
            .map_err(|err| err.in_operation(&self.name))
    }

    fn read_sample<P: Protocol + ?Sized>(
        &self,
        protocol: &mut P,
        slot: &mut [u8],
    ) -> Result<usize> {
        match self.operation {
            Operation::Function { id } => {
                let outcome = protocol.execute_function(id, &self.input, slot)?;
                self.check_code(outcome.error_code)?;
                Ok(outcome.output_len)
            }
            Operation::ReadVariable { id } => protocol.read_variable(id, slot),
            Operation::Curve {
                id,
                blocks,
                block_size,
            } => read_blocks(protocol, id, blocks, block_size, slot),
            Operation::WriteVariable { .. } => Err(ClientError::NotPollable(self.name.clone())),
        }
    }

    fn invoke<P: Protocol + ?Sized>(&mut self, protocol: &mut P) -> Result<usize> {
        match self.operation {
            Operation::Function { id } => {
                let outcome = protocol.execute_function(id, &self.input, &mut self.output)?;
                self.check_code(outcome.error_code)?;
                Ok(outcome.output_len)
            }
            Operation::ReadVariable { id } => protocol.read_variable(id, &mut self.output),
            Operation::WriteVariable { id } => {
                protocol.write_variable(id, &self.input)?;
                Ok(0)
            }
            Operation::Curve {
                id,
                blocks,
                block_size,
            } => {
                self.output = allocate_curve(&self.name, blocks, block_size)?;
                read_blocks(protocol, id, blocks, block_size, &mut self.output)
            }
        }
    }

    fn check_code(&self, code: u8) -> Result<()> {
        if code != 0 {
            return Err(ClientError::Invocation {
                operation: self.name.clone(),
                code,
            });
        }
        Ok(())
    }
}

/// Size of the assembled curve, or an allocation error above [`MAX_CURVE_SIZE`].
pub(crate) fn curve_size(name: &str, blocks: u16, block_size: usize) -> Result<usize> {
    match (blocks as usize).checked_mul(block_size) {
        Some(bytes) if bytes <= MAX_CURVE_SIZE => Ok(bytes),
        bytes => Err(ClientError::Allocation {
            operation: name.to_string(),
            bytes: bytes.unwrap_or(usize::MAX),
        }),
    }
}

pub(crate) fn allocate_curve(name: &str, blocks: u16, block_size: usize) -> Result<Vec<u8>> {
    let bytes = curve_size(name, blocks, block_size)?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes)
        .map_err(|_| ClientError::Allocation {
            operation: name.to_string(),
            bytes,
        })?;
    buf.resize(bytes, 0);
    Ok(buf)
}

/// Read every block of a curve back to back into `output`. Blocks shorter than
/// `block_size` end the curve early.
fn read_blocks<P: Protocol + ?Sized>(
    protocol: &mut P,
    id: u8,
    blocks: u16,
    block_size: usize,
    output: &mut [u8],
) -> Result<usize> {
    let mut filled = 0usize;
    for block in 0..blocks {
        let end = (filled + block_size).min(output.len());
        let got = protocol.read_curve_block(id, block, &mut output[filled..end])?;
        filled += got;
        if got < block_size {
            debug!(id, block, got, "short curve block ends curve");
            break;
        }
    }
    Ok(filled)
}
