use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Baud rate the remote peer runs at unless told otherwise.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Device names with this prefix are reached over TCP (e.g. a ser2net bridge).
pub const TCP_DEVICE_PREFIX: &str = "tcp://";

/// How long one driver read waits before the stream polls again.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Platform default serial device name.
pub fn default_serial_device() -> &'static str {
    if cfg!(windows) {
        "COM3"
    } else {
        "/dev/ttyUSB0"
    }
}

/// One direction of the serial link — implements Read + Write.
///
/// Reads block until at least one byte arrives; the driver's poll timeout
/// is not surfaced to callers.
pub struct LinkStream {
    inner: LinkStreamInner,
}

enum LinkStreamInner {
    Serial(Box<dyn SerialPort>),
    Tcp(TcpStream),
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Serial(port) => loop {
                match port.read(buf) {
                    Err(err) if err.kind() == ErrorKind::TimedOut => continue,
                    other => return other,
                }
            },
            LinkStreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Serial(port) => port.write(buf),
            LinkStreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            LinkStreamInner::Serial(port) => port.flush(),
            LinkStreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

impl LinkStream {
    /// Try to clone this stream (duplicates the OS handle).
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            LinkStreamInner::Serial(port) => LinkStreamInner::Serial(port.try_clone()?),
            LinkStreamInner::Tcp(stream) => LinkStreamInner::Tcp(stream.try_clone()?),
        };
        Ok(Self { inner })
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            LinkStreamInner::Serial(_) => "serial",
            LinkStreamInner::Tcp(_) => "tcp",
        };
        f.debug_struct("LinkStream").field("type", &kind).finish()
    }
}

/// The link to the remote peer.
#[derive(Debug)]
pub struct SerialLink {
    stream: LinkStream,
    device: String,
}

impl SerialLink {
    /// Open a serial device at `baud_rate`, 8N1, no flow control.
    ///
    /// `tcp://host:port` connects to a network-exposed serial port instead;
    /// the baud rate is then the remote end's concern.
    pub fn open(device: &str, baud_rate: u32) -> Result<Self> {
        if let Some(addr) = device.strip_prefix(TCP_DEVICE_PREFIX) {
            let stream = TcpStream::connect(addr).map_err(|source| TransportError::Connect {
                addr: addr.to_string(),
                source,
            })?;
            stream.set_nodelay(true)?;
            info!(device, "serial link open over tcp");
            return Ok(Self {
                stream: LinkStream {
                    inner: LinkStreamInner::Tcp(stream),
                },
                device: device.to_string(),
            });
        }

        let port = serialport::new(device, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(POLL_INTERVAL)
            .open()
            .map_err(|source| TransportError::Open {
                device: device.to_string(),
                source,
            })?;

        info!(device, baud_rate, "serial link open");
        Ok(Self {
            stream: LinkStream {
                inner: LinkStreamInner::Serial(port),
            },
            device: device.to_string(),
        })
    }

    /// Split into `(read half, write half)` sharing one device.
    pub fn split(self) -> Result<(LinkStream, LinkStream)> {
        let reader = self.stream.try_clone()?;
        debug!(device = %self.device, "serial link split");
        Ok((reader, self.stream))
    }

    /// The device identifier this link was opened with.
    pub fn device(&self) -> &str {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn default_device_is_platform_specific() {
        let device = default_serial_device();
        if cfg!(windows) {
            assert_eq!(device, "COM3");
        } else {
            assert!(device.starts_with("/dev/"));
        }
    }

    #[test]
    fn missing_device_fails_to_open() {
        let err = SerialLink::open("/dev/manetheren-does-not-exist", DEFAULT_BAUD_RATE)
            .unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
        assert!(err.to_string().contains("manetheren-does-not-exist"));
    }

    #[test]
    fn tcp_device_split_halves_share_connection() {
        let remote = TcpListener::bind("127.0.0.1:0").unwrap();
        let device = format!("tcp://{}", remote.local_addr().unwrap());

        let link = SerialLink::open(&device, DEFAULT_BAUD_RATE).unwrap();
        assert_eq!(link.device(), device);
        let (mut reader, mut writer) = link.split().unwrap();
        let (mut peer, _) = remote.accept().unwrap();

        writer.write_all(b"up").unwrap();
        let mut buf = [0u8; 2];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"up");

        peer.write_all(b"down").unwrap();
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"down");
    }

    #[test]
    fn tcp_device_refused_is_connect_error() {
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        // Listener dropped; nothing accepts on `addr` any more.
        let err = SerialLink::open(&format!("tcp://{addr}"), DEFAULT_BAUD_RATE).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
