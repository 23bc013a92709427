//! Full-length transfers over partial read/write primitives.
//!
//! Both backends plug their own primitive in here: the socket backend uses the
//! stream's `write`/`read`, the serial backend the port's.

use std::io::{ErrorKind, Read, Write};

use tracing::trace;

use crate::error::PartialTransfer;

/// Which way bytes move during a [`transfer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    fn zero_progress_kind(self) -> ErrorKind {
        match self {
            Direction::Read => ErrorKind::UnexpectedEof,
            Direction::Write => ErrorKind::WriteZero,
        }
    }
}

/// Drive `step` until `requested` bytes have moved or it fails.
///
/// `step` receives the current offset and returns how many bytes it moved from
/// that offset onward. Every iteration either advances the offset or ends the
/// loop: a step that moves zero bytes is a failure, as is any error.
///
/// The one exception is `ErrorKind::Interrupted`, which moved nothing and is
/// retried the same way `std::io::Write::write_all` retries it. A signal that
/// lands mid-transfer therefore does not abort the transfer; callers that
/// need to stop check their cancellation flag between transfers.
pub fn transfer<F>(
    direction: Direction,
    requested: usize,
    mut step: F,
) -> std::result::Result<usize, PartialTransfer>
where
    F: FnMut(usize) -> std::io::Result<usize>,
{
    let mut transferred = 0usize;

    while transferred < requested {
        let remaining = requested - transferred;
        match step(transferred) {
            Ok(0) => {
                return Err(PartialTransfer {
                    transferred,
                    requested,
                    source: std::io::Error::from(direction.zero_progress_kind()),
                });
            }
            Ok(n) if n > remaining => {
                return Err(PartialTransfer {
                    transferred,
                    requested,
                    source: std::io::Error::new(
                        ErrorKind::InvalidData,
                        format!("primitive reported {n} bytes for a {remaining}-byte window"),
                    ),
                });
            }
            Ok(n) => transferred += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(PartialTransfer {
                    transferred,
                    requested,
                    source,
                });
            }
        }
    }

    trace!(?direction, bytes = transferred, "transfer complete");
    Ok(transferred)
}

/// Write all of `buf`, reporting how much went out if the writer fails.
pub fn write_all_counted<W: Write + ?Sized>(
    writer: &mut W,
    buf: &[u8],
) -> std::result::Result<usize, PartialTransfer> {
    let sent = transfer(Direction::Write, buf.len(), |offset| {
        writer.write(&buf[offset..])
    })?;
    if let Err(source) = writer.flush() {
        return Err(PartialTransfer {
            transferred: sent,
            requested: buf.len(),
            source,
        });
    }
    Ok(sent)
}

/// Fill all of `buf`, reporting how much arrived if the reader fails.
pub fn read_all_counted<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> std::result::Result<usize, PartialTransfer> {
    let requested = buf.len();
    transfer(Direction::Read, requested, |offset| reader.read(&mut buf[offset..]))
}
