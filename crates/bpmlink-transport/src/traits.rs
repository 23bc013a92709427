use crate::error::Result;

/// Which backend sits under a [`Transport`]. Diagnostics only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    Tcp,
    Serial,
}

impl TransportKind {
    /// Transport name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            TransportKind::Tcp => "tcp",
            TransportKind::Serial => "serial",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A connected, blocking, half-duplex byte channel.
///
/// One value owns one open channel. `send_all` and `recv_all` either move the
/// whole buffer and return its length, or fail with
/// [`TransportError::Partial`](crate::TransportError::Partial) carrying the
/// count actually moved. Implementations never retry beyond the full-transfer
/// loop and never expose the underlying socket or device handle.
pub trait Transport {
    /// Send every byte of `buf`.
    fn send_all(&mut self, buf: &[u8]) -> Result<usize>;

    /// Fill every byte of `buf`.
    fn recv_all(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// The backend kind.
    fn kind(&self) -> TransportKind;

    /// Peer address or device path.
    fn describe(&self) -> String;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_all(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).send_all(buf)
    }

    fn recv_all(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).recv_all(buf)
    }

    fn kind(&self) -> TransportKind {
        (**self).kind()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_all(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).send_all(buf)
    }

    fn recv_all(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).recv_all(buf)
    }

    fn kind(&self) -> TransportKind {
        (**self).kind()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
