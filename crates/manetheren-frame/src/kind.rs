//! Message types and the services they address.
//!
//! The type byte is split in two halves of eight. Values 0-7 are "serve"
//! types (data being delivered), values 8-15 are "request" types (data being
//! asked for). A request and the serve type eight below it name the same
//! service.

use tracing::warn;

use crate::error::{FrameError, Result};

/// Highest valid type byte.
pub const MAX_MESSAGE_TYPE: u8 = 15;

/// Number of services; also the distance between a request and its serve type.
pub const SERVICE_COUNT: u8 = 8;

/// The logical services reachable over the link, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Weather,
    Forecast,
    Quote,
    Time,
    Calendar,
    Tasks,
    Config,
    Other,
}

impl ServiceKind {
    /// All services ordered by their serve type value.
    pub const ALL: [ServiceKind; 8] = [
        ServiceKind::Weather,
        ServiceKind::Forecast,
        ServiceKind::Quote,
        ServiceKind::Time,
        ServiceKind::Calendar,
        ServiceKind::Tasks,
        ServiceKind::Config,
        ServiceKind::Other,
    ];

    /// Service index in `0..8`.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Lower-case service name used in backend paths and publish payloads.
    pub fn name(self) -> &'static str {
        match self {
            ServiceKind::Weather => "weather",
            ServiceKind::Forecast => "forecast",
            ServiceKind::Quote => "quote",
            ServiceKind::Time => "time",
            ServiceKind::Calendar => "calendar",
            ServiceKind::Tasks => "tasks",
            ServiceKind::Config => "config",
            ServiceKind::Other => "other",
        }
    }

    /// Whether resolving this service needs an auxiliary string.
    pub fn requires_aux(self) -> bool {
        matches!(self, ServiceKind::Config | ServiceKind::Other)
    }

    /// Build `name + extension + aux`.
    ///
    /// An empty `aux` is treated as absent.
    pub fn resolve_path(self, extension: &str, aux: Option<&str>) -> Result<String> {
        let aux = aux.filter(|aux| !aux.is_empty());
        if self.requires_aux() && aux.is_none() {
            return Err(FrameError::MissingAux {
                service: self.name(),
            });
        }
        Ok(format!("{}{extension}{}", self.name(), aux.unwrap_or_default()))
    }

    fn from_index(index: u8) -> Self {
        Self::ALL[usize::from(index % SERVICE_COUNT)]
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which half of the type space a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Data being delivered.
    Serve,
    /// Data being asked for.
    Request,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Serve => "serve",
            Direction::Request => "request",
        }
    }
}

/// A decoded type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Serve(ServiceKind),
    Request(ServiceKind),
}

impl MessageType {
    /// Interpret a type byte from the wire.
    pub fn from_wire(value: u8) -> Result<Self> {
        match value {
            0..=7 => Ok(MessageType::Serve(ServiceKind::from_index(value))),
            8..=MAX_MESSAGE_TYPE => Ok(MessageType::Request(ServiceKind::from_index(value))),
            _ => Err(FrameError::InvalidType(value)),
        }
    }

    /// The type byte written on the wire.
    pub fn to_wire(self) -> u8 {
        match self {
            MessageType::Serve(service) => service.index(),
            MessageType::Request(service) => service.index() + SERVICE_COUNT,
        }
    }

    pub fn service(self) -> ServiceKind {
        service_of(self)
    }

    pub fn direction(self) -> Direction {
        direction_of(self)
    }

    /// The same service in the opposite direction.
    pub fn paired(self) -> Self {
        match self {
            MessageType::Serve(service) => MessageType::Request(service),
            MessageType::Request(service) => MessageType::Serve(service),
        }
    }

    /// All sixteen types in wire order.
    pub fn all() -> impl Iterator<Item = MessageType> {
        ServiceKind::ALL
            .into_iter()
            .map(MessageType::Serve)
            .chain(ServiceKind::ALL.into_iter().map(MessageType::Request))
    }
}

impl TryFrom<u8> for MessageType {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self> {
        MessageType::from_wire(value)
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> Self {
        value.to_wire()
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.direction().as_str(), self.service())
    }
}

pub fn service_of(message_type: MessageType) -> ServiceKind {
    match message_type {
        MessageType::Serve(service) | MessageType::Request(service) => service,
    }
}

pub fn direction_of(message_type: MessageType) -> Direction {
    match message_type {
        MessageType::Serve(_) => Direction::Serve,
        MessageType::Request(_) => Direction::Request,
    }
}

/// Service name for a raw type byte, or `None` for bytes above 15.
pub fn service_name(value: u8) -> Option<&'static str> {
    match MessageType::from_wire(value) {
        Ok(message_type) => Some(message_type.service().name()),
        Err(err) => {
            warn!(message_type = value, error = %err, "cannot name service");
            None
        }
    }
}

/// Resolve a raw type byte to `service + extension + aux`.
///
/// Failures are logged here; callers wanting an empty string on failure can
/// use `unwrap_or_default()`.
pub fn resolve_path(value: u8, extension: &str, aux: Option<&str>) -> Result<String> {
    let resolved =
        MessageType::from_wire(value).and_then(|t| t.service().resolve_path(extension, aux));
    if let Err(err) = &resolved {
        warn!(message_type = value, error = %err, "service path resolution failed");
    }
    resolved
}
