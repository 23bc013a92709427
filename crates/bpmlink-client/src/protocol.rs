use bpmlink_frame::{encode_message, PacketIo, HEADER_SIZE, MAX_MESSAGE};
use bytes::BytesMut;
use tracing::debug;

use crate::error::{ClientError, Result};

/// What a function call produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionOutcome {
    /// Device-side error code. Zero means success.
    pub error_code: u8,
    /// Bytes written to the output buffer.
    pub output_len: usize,
}

impl FunctionOutcome {
    pub fn ok(output_len: usize) -> Self {
        Self {
            error_code: 0,
            output_len,
        }
    }
}

/// The invocation primitives of a request/response protocol library.
///
/// Implementations own the encoding of identifiers and parameters. Dispatch
/// and polling only ever go through these four calls.
pub trait Protocol {
    /// Run function `id` with `input`, writing its result into `output`.
    fn execute_function(
        &mut self,
        id: u8,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<FunctionOutcome>;

    /// Read variable `id` into `output`, returning the bytes written.
    fn read_variable(&mut self, id: u8, output: &mut [u8]) -> Result<usize>;

    /// Write `input` to variable `id`.
    fn write_variable(&mut self, id: u8, input: &[u8]) -> Result<()>;

    /// Read block `block` of curve `id` into `output`, returning the bytes
    /// written.
    fn read_curve_block(&mut self, id: u8, block: u16, output: &mut [u8]) -> Result<usize>;
}

impl<P: Protocol + ?Sized> Protocol for &mut P {
    fn execute_function(
        &mut self,
        id: u8,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<FunctionOutcome> {
        (**self).execute_function(id, input, output)
    }

    fn read_variable(&mut self, id: u8, output: &mut [u8]) -> Result<usize> {
        (**self).read_variable(id, output)
    }

    fn write_variable(&mut self, id: u8, input: &[u8]) -> Result<()> {
        (**self).write_variable(id, input)
    }

    fn read_curve_block(&mut self, id: u8, block: u16, output: &mut [u8]) -> Result<usize> {
        (**self).read_curve_block(id, block, output)
    }
}

/// A [`Protocol`] for bench work that attaches no meaning to identifiers.
///
/// Every call is one request/response exchange: the operation id goes into
/// header byte 0, the input (or, for curves, the big-endian block index) is
/// the payload, and the response payload is copied to the output buffer. The
/// response's command byte is not checked and no error codes are decoded.
pub struct PassthroughProtocol<P> {
    io: P,
    tx: BytesMut,
    rx: Box<[u8]>,
}

impl<P: PacketIo> PassthroughProtocol<P> {
    pub fn new(io: P) -> Self {
        Self {
            io,
            tx: BytesMut::with_capacity(HEADER_SIZE + 64),
            rx: vec![0u8; MAX_MESSAGE].into_boxed_slice(),
        }
    }

    /// One request/response exchange; returns the response payload.
    pub fn exchange(&mut self, command: u8, payload: &[u8]) -> Result<&[u8]> {
        self.tx.clear();
        encode_message(command, payload, &mut self.tx)?;
        self.io.send(&self.tx)?;
        let len = self.io.recv(&mut self.rx)?;
        debug!(command, sent = payload.len(), received = len - HEADER_SIZE, "exchange");
        Ok(&self.rx[HEADER_SIZE..len])
    }

    fn exchange_into(&mut self, command: u8, payload: &[u8], output: &mut [u8]) -> Result<usize> {
        let response = self.exchange(command, payload)?;
        if response.len() > output.len() {
            return Err(ClientError::ResponseTooLarge {
                size: response.len(),
                capacity: output.len(),
            });
        }
        output[..response.len()].copy_from_slice(response);
        Ok(response.len())
    }

    /// Consume the protocol and return the packet channel.
    pub fn into_inner(self) -> P {
        self.io
    }
}

impl<P: PacketIo> Protocol for PassthroughProtocol<P> {
    fn execute_function(
        &mut self,
        id: u8,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<FunctionOutcome> {
        let len = self.exchange_into(id, input, output)?;
        Ok(FunctionOutcome::ok(len))
    }

    fn read_variable(&mut self, id: u8, output: &mut [u8]) -> Result<usize> {
        self.exchange_into(id, &[], output)
    }

    fn write_variable(&mut self, id: u8, input: &[u8]) -> Result<()> {
        self.exchange(id, input)?;
        Ok(())
    }

    fn read_curve_block(&mut self, id: u8, block: u16, output: &mut [u8]) -> Result<usize> {
        self.exchange_into(id, &block.to_be_bytes(), output)
    }
}
