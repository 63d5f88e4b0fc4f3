use std::io::Write;
use std::net::SocketAddr;

use manetheren_frame::ServiceKind;
use tracing::debug;

use crate::config::DEFAULT_PUBLISH_ADDR;
use crate::dispatch::Publisher;
use crate::error::Result;

/// Build the publish record: `{type:"<service>",message:<message>}`.
///
/// The message bytes are embedded unquoted and unescaped.
pub fn publish_payload(service: ServiceKind, message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 32);
    out.extend_from_slice(b"{type:\"");
    out.extend_from_slice(service.name().as_bytes());
    out.extend_from_slice(b"\",message:");
    out.extend_from_slice(message);
    out.push(b'}');
    out
}

/// Delivers each publish over a fresh TCP connection, closed after writing.
#[derive(Debug, Clone)]
pub struct TcpPublisher {
    addr: SocketAddr,
}

impl TcpPublisher {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Default for TcpPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLISH_ADDR)
    }
}

impl Publisher for TcpPublisher {
    fn publish(&self, service: ServiceKind, message: &[u8]) -> Result<()> {
        let record = publish_payload(service, message);
        let mut stream = manetheren_transport::tcp::connect(self.addr)?;
        stream.write_all(&record)?;
        stream.flush()?;
        debug!(%service, addr = %self.addr, size = record.len(), "published");
        Ok(())
    }
}
