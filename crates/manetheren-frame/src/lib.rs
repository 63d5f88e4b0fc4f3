//! Marker-synchronized, length-prefixed framing for the manetheren serial protocol.
//!
//! Every message is framed with:
//! - A start byte `0x00` and protocol marker `0xFA` for stream synchronization
//! - A 4-byte big-endian payload length
//! - A 1-byte message type (0-15)
//!
//! Readers resynchronize on the marker pair between frames only; once a
//! header is accepted the declared payload is consumed verbatim.

pub mod codec;
pub mod error;
pub mod kind;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, parse_frame, Frame, FrameConfig, HEADER_SIZE, MARKER_BYTE,
    MAX_PAYLOAD, START_BYTE, SYNC,
};
pub use error::{FrameError, Result};
pub use kind::{
    direction_of, resolve_path, service_name, service_of, Direction, MessageType, ServiceKind,
    MAX_MESSAGE_TYPE,
};
pub use reader::FrameReader;
pub use writer::{FrameWriter, SharedFrameWriter};
