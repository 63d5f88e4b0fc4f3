use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use manetheren_frame::parse_frame;
use manetheren_transport::TcpEndpoint;
use tracing::{debug, warn};

use crate::dispatch::{MessageHandler, Route};
use crate::error::Result;

/// Accepts local connections that each carry one frame.
///
/// A client writes a single frame and closes its write side; the connection
/// is read to the end before decoding. Nothing is written back. Every
/// connection gets its own thread, so a client that never closes holds up
/// nobody else.
#[derive(Debug)]
pub struct RequestListener {
    endpoint: TcpEndpoint,
}

impl RequestListener {
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let endpoint = TcpEndpoint::bind(addr)?;
        Ok(Self { endpoint })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// Accept connections forever, handling each on its own thread.
    ///
    /// Accept failures, and failures to spawn a connection thread, are
    /// logged and the loop continues.
    pub fn serve(&self, handler: Arc<dyn MessageHandler>) -> Result<()> {
        loop {
            let (stream, peer) = match self.endpoint.accept() {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    continue;
                }
            };

            let handler = Arc::clone(&handler);
            let spawned = thread::Builder::new()
                .name(format!("request-{peer}"))
                .spawn(move || {
                    if let Err(err) = handle_connection(stream, peer, handler.as_ref()) {
                        warn!(%peer, error = %err, "request connection failed");
                    }
                });
            if let Err(err) = spawned {
                warn!(%peer, error = %err, "could not start connection thread");
            }
        }
    }
}

/// Read one frame from `stream` and route it.
///
/// Returns `Ok(None)` when the bytes do not form a frame; that is logged and
/// nothing is dispatched.
pub fn handle_connection(
    mut stream: impl Read,
    peer: SocketAddr,
    handler: &dyn MessageHandler,
) -> Result<Option<Route>> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    debug!(%peer, size = buf.len(), "request connection closed");

    let frame = match parse_frame(&buf) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(%peer, size = buf.len(), error = %err, "dropping malformed request");
            return Ok(None);
        }
    };

    handler
        .handle_tcp_message(frame.message_type, frame.payload.as_ref())
        .map(Some)
}
