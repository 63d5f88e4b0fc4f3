use std::borrow::Cow;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{FrameError, Result};
use crate::kind::MessageType;

/// Frame header: start (1) + marker (1) + length (4) + type (1) = 7 bytes.
pub const HEADER_SIZE: usize = 7;

/// First byte of every frame.
pub const START_BYTE: u8 = 0x00;

/// Protocol marker following the start byte.
pub const MARKER_BYTE: u8 = 0xFA;

/// The two-byte sync pair a decoder scans for.
pub const SYNC: [u8; 2] = [START_BYTE, MARKER_BYTE];

/// Largest payload the 4-byte length field can describe.
pub const MAX_PAYLOAD: usize = u32::MAX as usize;

/// One message on the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// What the payload is and which way it is going.
    pub message_type: MessageType,
    /// The message payload (UTF-8 text by convention).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(message_type: MessageType, payload: impl Into<Bytes>) -> Self {
        Self {
            message_type,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Payload as text, replacing invalid UTF-8 sequences.
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────┬────────┬────────────┬────────┬──────────────────┐
/// │ Start │ Marker │ Length     │ Type   │ Payload          │
/// │ 0x00  │ 0xFA   │ (4B BE)    │ (1B)   │ (Length bytes)   │
/// └───────┴────────┴────────────┴────────┴──────────────────┘
/// ```
pub fn encode_frame(message_type: MessageType, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&SYNC);
    dst.put_u32(payload.len() as u32);
    dst.put_u8(message_type.to_wire());
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a growing buffer.
///
/// Bytes ahead of the first `0x00 0xFA` pair are discarded. Returns
/// `Ok(None)` if the buffer doesn't contain a complete frame yet. Once a
/// header is present, exactly `length` payload bytes are taken regardless of
/// their content. A frame with an out-of-range type is consumed and reported
/// as `InvalidType`.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    match find_sync(src) {
        Some(offset) => {
            if offset > 0 {
                debug!(skipped = offset, "discarding bytes ahead of sync");
                src.advance(offset);
            }
        }
        None => {
            // A trailing start byte may be the first half of the next sync pair.
            let keep = usize::from(src.last() == Some(&START_BYTE));
            let discard = src.len() - keep;
            src.advance(discard);
            return Ok(None);
        }
    }

    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let mut header = &src[SYNC.len()..HEADER_SIZE];
    let payload_len = header.get_u32() as usize;
    let type_byte = header.get_u8();

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    if src.len() < HEADER_SIZE + payload_len {
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    let message_type = MessageType::from_wire(type_byte)?;

    Ok(Some(Frame {
        message_type,
        payload,
    }))
}

/// Parse one frame from a complete buffer with no resynchronization.
///
/// The buffer must start with the sync pair and hold at least the declared
/// payload. Bytes past the declared payload are ignored.
pub fn parse_frame(buf: &[u8]) -> Result<Frame> {
    if buf.len() < HEADER_SIZE {
        return Err(FrameError::Truncated {
            expected: HEADER_SIZE,
            actual: buf.len(),
        });
    }
    if buf[..SYNC.len()] != SYNC {
        return Err(FrameError::InvalidMarker);
    }

    let mut header = &buf[SYNC.len()..HEADER_SIZE];
    let payload_len = header.get_u32() as usize;
    let message_type = MessageType::from_wire(header.get_u8())?;

    let end = HEADER_SIZE + payload_len;
    if buf.len() < end {
        return Err(FrameError::Truncated {
            expected: end,
            actual: buf.len(),
        });
    }
    if buf.len() > end {
        debug!(trailing = buf.len() - end, "ignoring bytes after declared payload");
    }

    Ok(Frame {
        message_type,
        payload: Bytes::copy_from_slice(&buf[HEADER_SIZE..end]),
    })
}

fn find_sync(buf: &[u8]) -> Option<usize> {
    buf.windows(SYNC.len()).position(|pair| pair == SYNC)
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: whatever the length field allows.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
        }
    }
}
