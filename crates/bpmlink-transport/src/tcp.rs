use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::io::{read_all_counted, write_all_counted};
use crate::traits::{Transport, TransportKind};

/// Port used when a TCP target does not name one.
pub const DEFAULT_TCP_PORT: u16 = 8080;

/// Socket backend configuration.
#[derive(Debug, Clone, Default)]
pub struct TcpConfig {
    /// Per-candidate connect timeout. `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
}

/// Stream-socket transport.
///
/// Send coalescing (Nagle) is always disabled: protocol messages are small and
/// strictly request/response, so any delay on send stalls the whole exchange.
/// Reads carry no timeout; a silent peer blocks `recv_all` indefinitely.
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpTransport {
    /// Resolve `host:port` and connect to the first candidate that accepts.
    ///
    /// Both IPv4 and IPv6 results are tried, in resolver order.
    pub fn connect(host: &str, port: u16, config: &TcpConfig) -> Result<Self> {
        let target = format!("{host}:{port}");
        let candidates: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                target: target.clone(),
                source,
            })?
            .collect();

        if candidates.is_empty() {
            return Err(TransportError::Resolve {
                target,
                source: std::io::Error::new(ErrorKind::NotFound, "no addresses returned"),
            });
        }
        debug!(%target, candidates = candidates.len(), "resolved tcp target");

        let mut last_err = None;
        for addr in &candidates {
            let attempt = match config.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    let transport = Self::configure(stream, *addr, &target)?;
                    info!(%target, peer = %addr, "connected over tcp");
                    return Ok(transport);
                }
                Err(err) => {
                    warn!(%target, candidate = %addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::NoReachableAddress {
            target,
            attempts: candidates.len(),
            source: last_err
                .unwrap_or_else(|| std::io::Error::from(ErrorKind::AddrNotAvailable)),
        })
    }


    fn configure(stream: TcpStream, peer: SocketAddr, target: &str) -> Result<Self> {
        stream
            .set_nodelay(true)
            .map_err(|source| TransportError::Configure {
                target: target.to_string(),
                source,
            })?;
        Ok(Self { stream, peer })
    }

    /// The connected peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for TcpTransport {
    fn send_all(&mut self, buf: &[u8]) -> Result<usize> {
        write_all_counted(&mut self.stream, buf).map_err(Into::into)
    }

    fn recv_all(&mut self, buf: &mut [u8]) -> Result<usize> {
        read_all_counted(&mut self.stream, buf).map_err(Into::into)
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn describe(&self) -> String {
        self.peer.to_string()
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer", &self.peer)
            .finish()
    }
}
