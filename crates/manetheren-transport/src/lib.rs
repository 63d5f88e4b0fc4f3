//! Byte transports for the manetheren bridge.
//!
//! - [`SerialLink`] — the long-lived link to the remote peer, split into a
//!   read half and a write half
//! - [`tcp`] — local TCP listeners and one-shot outbound connections
//!
//! Nothing here knows about frames; this is the lowest layer.

pub mod error;
pub mod serial;
pub mod tcp;

pub use error::{Result, TransportError};
pub use serial::{default_serial_device, LinkStream, SerialLink, DEFAULT_BAUD_RATE};
pub use tcp::TcpEndpoint;
