use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::io::{read_all_counted, write_all_counted};
use crate::traits::{Transport, TransportKind};

/// Line rate used by the RF front-end's RS-232 console.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Idle time after which a read returns with whatever has arrived.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Serial backend configuration.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Line rate in bits per second.
    pub baud_rate: u32,
    /// Read idle timeout. An expired timeout ends the current transfer short.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// RS-232 transport.
///
/// The line is put in raw mode: 8 data bits, no parity, one stop bit, no
/// flow control, no echo or line discipline.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    path: PathBuf,
}

impl SerialTransport {
    /// Open and configure the device at `path` (blocking).
    pub fn open(path: impl AsRef<Path>, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref();
        let port = serialport::new(path.to_string_lossy(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(
            ?path,
            baud = config.baud_rate,
            timeout_ms = config.read_timeout.as_millis() as u64,
            "serial line configured (8N1, raw)"
        );
        info!(?path, "opened serial device");

        Ok(Self {
            port,
            path: path.to_path_buf(),
        })
    }

    /// Wrap a port that was opened elsewhere.
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        let path = PathBuf::from(port.name().unwrap_or_else(|| "<unnamed>".to_string()));
        Self { port, path }
    }
}

impl Transport for SerialTransport {
    fn send_all(&mut self, buf: &[u8]) -> Result<usize> {
        write_all_counted(&mut self.port, buf).map_err(Into::into)
    }

    fn recv_all(&mut self, buf: &mut [u8]) -> Result<usize> {
        read_all_counted(&mut self.port, buf).map_err(Into::into)
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_9600_with_half_second_timeout() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.baud_rate, 9600);
        assert_eq!(cfg.read_timeout, Duration::from_millis(500));
    }

    #[cfg(unix)]
    fn pty_pair(timeout: Duration) -> (SerialTransport, SerialTransport) {
        let (mut host, mut device) = serialport::TTYPort::pair().expect("pty pair should open");
        host.set_timeout(timeout).unwrap();
        device.set_timeout(timeout).unwrap();
        (
            SerialTransport::from_port(Box::new(host)),
            SerialTransport::from_port(Box::new(device)),
        )
    }

    #[cfg(unix)]
    #[test]
    fn packet_crosses_the_line_intact() {
        let (mut host, mut device) = pty_pair(Duration::from_millis(500));
        let packet = [0x10, 0x00, 0x02, 0xAA, 0xBB];

        assert_eq!(host.send_all(&packet).unwrap(), packet.len());

        let mut received = [0u8; 5];
        assert_eq!(device.recv_all(&mut received).unwrap(), packet.len());
        assert_eq!(received, packet);
        assert_eq!(device.kind(), TransportKind::Serial);
    }

    #[cfg(unix)]
    #[test]
    fn idle_line_mid_read_is_a_timed_out_partial_transfer() {
        let (mut host, mut device) = pty_pair(Duration::from_millis(100));
        host.send_all(&[0x01, 0x00]).unwrap();

        let mut received = [0u8; 4];
        let err = device.recv_all(&mut received).unwrap_err();

        assert_eq!(err.transferred(), Some(2));
        match err {
            TransportError::Partial(partial) => {
                assert_eq!(partial.requested, 4);
                assert_eq!(partial.source.kind(), std::io::ErrorKind::TimedOut);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(&received[..2], &[0x01, 0x00]);
    }

    #[test]
    fn missing_device_is_an_establishment_error() {
        let err = SerialTransport::open("/dev/bpmlink-does-not-exist", &SerialConfig::default())
            .unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
        assert!(err.is_establishment());
    }
}
