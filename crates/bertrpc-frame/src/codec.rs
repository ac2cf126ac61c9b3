use std::time::Duration;

use bertrpc_term::{Encoder, Term};
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: 4-byte big-endian body length.
pub const HEADER_SIZE: usize = 4;

/// Default maximum body size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Encode a pre-serialized term into the BERP wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬─────────────────────────┐
/// │ Length (4B BE)   │ Term bytes (Length)     │
/// │                  │ 131, tag, ...           │
/// └──────────────────┴─────────────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u32(len);
    dst.put_slice(payload);
    Ok(())
}

/// Encode `term` and its header straight into `dst`.
///
/// The body is checked against `max_payload`; on any error `dst` is left
/// unchanged.
pub fn encode_term_frame(
    encoder: &Encoder,
    term: &Term,
    dst: &mut BytesMut,
    max_payload: usize,
) -> Result<()> {
    let mark = dst.len();
    dst.put_u32(0);
    if let Err(err) = encoder.encode_into(term, dst) {
        dst.truncate(mark);
        return Err(err.into());
    }

    let size = dst.len() - mark - HEADER_SIZE;
    if size > max_payload || size > u32::MAX as usize {
        dst.truncate(mark);
        return Err(FrameError::PayloadTooLarge {
            size,
            max: max_payload,
        });
    }
    dst[mark..mark + HEADER_SIZE].copy_from_slice(&(size as u32).to_be_bytes());
    Ok(())
}

/// Peek at the declared body length without consuming anything.
///
/// Returns `Ok(None)` until the full header is buffered.
pub fn peek_length(src: &[u8], max_payload: usize) -> Result<Option<usize>> {
    let Some(header) = src.get(..HEADER_SIZE) else {
        return Ok(None);
    };
    let mut header = header;
    let len = header.get_u32() as usize;
    if len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: max_payload,
        });
    }
    Ok(Some(len))
}

/// Decode one frame body from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. An oversized
/// declared length is reported without consuming the header, so every
/// later call reports it again.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    let Some(len) = peek_length(src, max_payload)? else {
        return Ok(None);
    };

    let total = HEADER_SIZE + len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(len).freeze()))
}

/// Configuration for BERP framing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum body size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl FrameConfig {
    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }
}
