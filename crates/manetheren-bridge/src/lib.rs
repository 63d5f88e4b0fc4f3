//! The bridge between the serial link, the HTTP backend and the local display.
//!
//! Two loops run side by side once a [`Bridge`] is started:
//!
//! - the serial reader decodes frames from the remote peer and hands each
//!   one to a worker pool, which answers requests from the backend and
//!   publishes served data to the display
//! - the request listener accepts one-frame connections from local
//!   processes, forwarding requests to the peer and turning serve types
//!   into forced pushes
//!
//! The routing rules live in [`Dispatcher`]; its collaborators are the
//! [`Backend`], [`Publisher`] and [`FrameSink`] traits so they can be
//! swapped out in tests.

pub mod backend;
pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod listener;
pub mod pool;
pub mod publisher;
pub mod serial;

pub use backend::HttpBackend;
pub use bridge::Bridge;
pub use config::{
    BridgeConfig, BACKEND_EXTENSION, DEFAULT_PUBLISH_ADDR, DEFAULT_REQUEST_ADDR,
    DEFAULT_SERVICE_ROOT, PUBLISH_PORT, REQUEST_PORT,
};
pub use dispatch::{
    Backend, BackendResponse, Dispatcher, FrameSink, MessageHandler, Publisher, RequestContext,
    Route,
};
pub use error::{BridgeError, Result};
pub use listener::{handle_connection, RequestListener};
pub use pool::WorkerPool;
pub use publisher::{publish_payload, TcpPublisher};
pub use serial::run_serial_reader;
