/// Errors that can occur during frame encoding/decoding and type resolution.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A read failed while scanning for the `0x00 0xFA` sync pair.
    #[error("read failed while scanning for sync: {0}")]
    Scan(std::io::Error),

    /// The buffer does not start with the `0x00 0xFA` markers.
    #[error("missing frame markers (expected 0x00 0xFA)")]
    InvalidMarker,

    /// The type byte is outside the sixteen defined message types.
    #[error("invalid message type {0} (expected 0-15)")]
    InvalidType(u8),

    /// The service requires an auxiliary string and none was supplied.
    #[error("service '{service}' requires an auxiliary parameter")]
    MissingAux { service: &'static str },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A whole buffer ended before the declared frame did.
    #[error("truncated frame ({actual} bytes, need {expected})")]
    Truncated { expected: usize, actual: usize },

    /// An I/O error occurred while reading or writing a committed frame.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether a streaming reader must stop after this error.
    ///
    /// Scan failures happen between frames and invalid types are only
    /// reported after the payload was consumed, so in both cases the stream
    /// is still aligned and decoding may continue.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FrameError::Scan(_) | FrameError::InvalidType(_))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_and_type_errors_are_recoverable() {
        let scan = FrameError::Scan(std::io::Error::other("noise"));
        assert!(!scan.is_fatal());
        assert!(!FrameError::InvalidType(16).is_fatal());
    }

    #[test]
    fn committed_frame_errors_are_fatal() {
        assert!(FrameError::ConnectionClosed.is_fatal());
        assert!(FrameError::Io(std::io::Error::other("gone")).is_fatal());
        assert!(FrameError::PayloadTooLarge { size: 2, max: 1 }.is_fatal());
    }
}
