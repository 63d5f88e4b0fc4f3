//! Serial-to-local-network bridge for manetheren services.
//!
//! A remote device on a serial link asks for service content (weather,
//! time, quotes, ...) and pushes data of its own. This crate answers the
//! requests from an HTTP backend, publishes pushed data to a local display
//! over TCP, and lets local processes inject frames toward the device.
//!
//! # Crate Structure
//!
//! - [`transport`] — Serial link and local TCP sockets
//! - [`frame`] — Wire framing and the message type registry
//! - [`bridge`] — Dispatch engine and the running bridge (behind `bridge` feature)

/// Re-export transport types.
pub mod transport {
    pub use manetheren_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use manetheren_frame::*;
}

/// Re-export bridge types (requires `bridge` feature).
#[cfg(feature = "bridge")]
pub mod bridge {
    pub use manetheren_bridge::*;
}
