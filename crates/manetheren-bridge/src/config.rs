use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use manetheren_transport::{default_serial_device, DEFAULT_BAUD_RATE};

/// Local port accepting frames from the display side.
pub const REQUEST_PORT: u16 = 50999;

/// Local port of the display client receiving published data.
pub const PUBLISH_PORT: u16 = 50998;

/// Root every backend service path is appended to.
pub const DEFAULT_SERVICE_ROOT: &str = "http://manetheren/services/";

/// Extension appended to the service name for backend requests.
pub const BACKEND_EXTENSION: &str = ".php";

pub const DEFAULT_REQUEST_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, REQUEST_PORT));

pub const DEFAULT_PUBLISH_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, PUBLISH_PORT));

/// Everything needed to start a [`crate::Bridge`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Serial device name, or `tcp://host:port`.
    pub serial_device: String,
    pub baud_rate: u32,
    /// Where the request listener binds.
    pub request_addr: SocketAddr,
    /// Where served data is published.
    pub publish_addr: SocketAddr,
    /// Backend URL prefix, ending in `/`.
    pub service_root: String,
    /// Threads handling decoded serial frames.
    pub dispatch_workers: usize,
    /// Decoded frames that may wait for a dispatch worker before the
    /// serial reader blocks.
    pub dispatch_queue_depth: usize,
}

impl BridgeConfig {
    /// Production defaults for everything but the device.
    pub fn for_device(device: impl Into<String>) -> Self {
        Self {
            serial_device: device.into(),
            ..Self::default()
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            serial_device: default_serial_device().to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            request_addr: DEFAULT_REQUEST_ADDR,
            publish_addr: DEFAULT_PUBLISH_ADDR,
            service_root: DEFAULT_SERVICE_ROOT.to_string(),
            dispatch_workers: 4,
            dispatch_queue_depth: 64,
        }
    }
}
