use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use crate::codec::{Frame, FrameConfig, HEADER_SIZE, MARKER_BYTE, START_BYTE, SYNC};
use crate::error::{FrameError, Result};
use crate::kind::MessageType;

/// Upper bound on a single payload read; the buffer grows as bytes arrive.
const READ_CHUNK: usize = 8 * 1024;

/// Reads complete frames from a blocking byte stream.
///
/// Scans one byte at a time for the `0x00 0xFA` pair, then reads the rest
/// of the header and exactly `length` payload bytes. Nothing past the end of
/// the current frame is consumed, so the next call starts scanning exactly
/// where this frame ended.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
    /// Last byte seen while scanning; survives a failed scan.
    prev: Option<u8>,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            config,
            prev: None,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Errors from the scan phase are `FrameError::Scan` and leave the
    /// reader usable. Errors after the sync pair was found mean the stream
    /// is broken mid-frame; see [`FrameError::is_fatal`].
    pub fn read_frame(&mut self) -> Result<Frame> {
        self.scan_for_sync()?;

        let mut header = [0u8; HEADER_SIZE - SYNC.len()];
        self.read_committed(&mut header)?;
        let mut fields = &header[..];
        let payload_len = fields.get_u32() as usize;
        let type_byte = fields.get_u8();

        if payload_len > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload_len,
                max: self.config.max_payload_size,
            });
        }

        let payload = self.read_payload(payload_len)?;
        debug!(message_type = type_byte, size = payload_len, "frame decoded");

        Ok(Frame {
            message_type: MessageType::from_wire(type_byte)?,
            payload: payload.freeze(),
        })
    }

    fn scan_for_sync(&mut self) -> Result<()> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Scan(err)),
            }

            let prev = self.prev.replace(byte[0]);
            if prev == Some(START_BYTE) && byte[0] == MARKER_BYTE {
                self.prev = None;
                return Ok(());
            }
            trace!(byte = byte[0], "skipping byte while scanning");
        }
    }

    fn read_committed(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(())
    }

    /// Read exactly `len` payload bytes without reserving `len` up front.
    fn read_payload(&mut self, len: usize) -> Result<BytesMut> {
        let mut payload = BytesMut::with_capacity(len.min(READ_CHUNK));
        let mut chunk = [0u8; READ_CHUNK];
        while payload.len() < len {
            let want = (len - payload.len()).min(READ_CHUNK);
            match self.inner.read(&mut chunk[..want]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => payload.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(payload)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Frame>;

    /// Yields frames until the stream closes.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Err(FrameError::ConnectionClosed) => None,
            other => Some(other),
        }
    }
}
