//! Routing of decoded messages between the link, the backend and the display.
//!
//! Messages from the serial link:
//! - request types are answered from the backend with the paired serve type
//! - serve types are published to the local display
//!
//! Messages from the local request listener:
//! - request types are forwarded to the remote peer unchanged
//! - serve types are turned into the paired request and answered as if the
//!   remote peer had asked, forcing a push

use std::io::Write;
use std::sync::Arc;

use manetheren_frame::{MessageType, ServiceKind, SharedFrameWriter};
use tracing::{debug, info, warn};

use crate::error::Result;

/// A backend request: the message type plus the optional auxiliary string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub message_type: MessageType,
    /// Extra path text; `None` when absent or empty.
    pub aux: Option<String>,
}

impl RequestContext {
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            aux: None,
        }
    }

    pub fn with_aux(mut self, aux: impl Into<String>) -> Self {
        let aux = aux.into();
        self.aux = (!aux.is_empty()).then_some(aux);
        self
    }

    /// Context for a message whose payload is the auxiliary text.
    pub fn from_payload(message_type: MessageType, payload: &[u8]) -> Self {
        Self::new(message_type).with_aux(String::from_utf8_lossy(payload))
    }

    pub fn service(&self) -> ServiceKind {
        self.message_type.service()
    }

    /// `service + extension + aux`; failures are logged by the resolver.
    pub fn resolve_path(&self, extension: &str) -> manetheren_frame::Result<String> {
        manetheren_frame::resolve_path(
            self.message_type.to_wire(),
            extension,
            self.aux.as_deref(),
        )
    }
}

/// A successful backend answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendResponse {
    Content(String),
    /// The backend answered with an empty body.
    Empty,
}

impl BackendResponse {
    pub fn from_body(body: String) -> Self {
        if body.is_empty() {
            BackendResponse::Empty
        } else {
            BackendResponse::Content(body)
        }
    }

    /// Reply payload to send back over the link.
    pub fn into_payload(self) -> String {
        match self {
            BackendResponse::Content(body) => body,
            BackendResponse::Empty => String::new(),
        }
    }
}

/// Source of service content for request types.
pub trait Backend: Send + Sync {
    fn fetch(&self, request: &RequestContext) -> Result<BackendResponse>;
}

/// Consumer of served data on the local side.
pub trait Publisher: Send + Sync {
    fn publish(&self, service: ServiceKind, message: &[u8]) -> Result<()>;
}

/// Outbound side of the serial link.
pub trait FrameSink: Send + Sync {
    fn send_frame(&self, message_type: MessageType, payload: &[u8])
        -> manetheren_frame::Result<()>;
}

impl<W: Write + Send> FrameSink for SharedFrameWriter<W> {
    fn send_frame(
        &self,
        message_type: MessageType,
        payload: &[u8],
    ) -> manetheren_frame::Result<()> {
        self.send(message_type, payload)
    }
}

impl<T: Backend + ?Sized> Backend for Arc<T> {
    fn fetch(&self, request: &RequestContext) -> Result<BackendResponse> {
        (**self).fetch(request)
    }
}

impl<T: Publisher + ?Sized> Publisher for Arc<T> {
    fn publish(&self, service: ServiceKind, message: &[u8]) -> Result<()> {
        (**self).publish(service, message)
    }
}

impl<T: FrameSink + ?Sized> FrameSink for Arc<T> {
    fn send_frame(
        &self,
        message_type: MessageType,
        payload: &[u8],
    ) -> manetheren_frame::Result<()> {
        (**self).send_frame(message_type, payload)
    }
}

/// What handling one message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The backend was asked and a reply of `reply_type` went out on the link.
    Replied {
        reply_type: MessageType,
        payload_len: usize,
        backend_ok: bool,
    },
    /// Served data was handed to the publisher.
    Published {
        service: ServiceKind,
        delivered: bool,
    },
    /// A request was passed on to the remote peer.
    Forwarded { message_type: MessageType },
}

/// Entry points shared by the serial reader and the request listener.
pub trait MessageHandler: Send + Sync {
    fn handle_serial_message(&self, message_type: MessageType, payload: &[u8]) -> Result<Route>;

    fn handle_tcp_message(&self, message_type: MessageType, payload: &[u8]) -> Result<Route>;
}

/// The dispatch engine.
pub struct Dispatcher<B, P, S> {
    backend: B,
    publisher: P,
    sink: S,
}

impl<B: Backend, P: Publisher, S: FrameSink> Dispatcher<B, P, S> {
    pub fn new(backend: B, publisher: P, sink: S) -> Self {
        Self {
            backend,
            publisher,
            sink,
        }
    }

    /// Handle a message that arrived from the remote peer.
    ///
    /// A failed backend call still produces an empty reply so the peer is
    /// never left waiting. Only a failed write to the link is returned.
    pub fn handle_serial_message(&self, message_type: MessageType, payload: &[u8]) -> Result<Route> {
        match message_type {
            MessageType::Request(_) => {
                let request = RequestContext::from_payload(message_type, payload);
                let (reply, backend_ok) = match self.backend.fetch(&request) {
                    Ok(response) => (response.into_payload(), true),
                    Err(err) => {
                        warn!(%message_type, error = %err, "backend request failed; replying empty");
                        (String::new(), false)
                    }
                };

                let reply_type = message_type.paired();
                self.sink.send_frame(reply_type, reply.as_bytes())?;
                info!(%message_type, %reply_type, size = reply.len(), "request answered");

                Ok(Route::Replied {
                    reply_type,
                    payload_len: reply.len(),
                    backend_ok,
                })
            }
            MessageType::Serve(service) => {
                let delivered = match self.publisher.publish(service, payload) {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(%service, error = %err, "publish to display failed");
                        false
                    }
                };
                Ok(Route::Published { service, delivered })
            }
        }
    }

    /// Handle a message that arrived on the local request listener.
    pub fn handle_tcp_message(&self, message_type: MessageType, payload: &[u8]) -> Result<Route> {
        match message_type {
            MessageType::Request(_) => {
                self.sink.send_frame(message_type, payload)?;
                info!(%message_type, size = payload.len(), "request forwarded to peer");
                Ok(Route::Forwarded { message_type })
            }
            MessageType::Serve(_) => {
                let request = message_type.paired();
                debug!(%message_type, %request, "forcing push");
                self.handle_serial_message(request, payload)
            }
        }
    }
}

impl<B: Backend, P: Publisher, S: FrameSink> MessageHandler for Dispatcher<B, P, S> {
    fn handle_serial_message(&self, message_type: MessageType, payload: &[u8]) -> Result<Route> {
        Dispatcher::handle_serial_message(self, message_type, payload)
    }

    fn handle_tcp_message(&self, message_type: MessageType, payload: &[u8]) -> Result<Route> {
        Dispatcher::handle_tcp_message(self, message_type, payload)
    }
}
