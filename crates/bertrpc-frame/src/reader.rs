use std::io::{ErrorKind, Read};

use bertrpc_term::{Decoder, Term};
use bertrpc_transport::BertStream;
use bytes::{Bytes, BytesMut};

use crate::codec::{decode_frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Bytes requested from the stream per `read` call.
const CHUNK: usize = 8 * 1024;

/// Blocking BERP frame reader over any [`Read`] source.
///
/// Bytes that arrive past the end of one frame stay buffered for the next
/// call, so short reads and coalesced frames are both handled here.
pub struct FrameReader<T> {
    source: T,
    pending: BytesMut,
    config: FrameConfig,
    decoder: Decoder,
}

impl<T: Read> FrameReader<T> {
    pub fn new(source: T) -> Self {
        Self::with_config(source, FrameConfig::default())
    }

    pub fn with_config(source: T, config: FrameConfig) -> Self {
        Self {
            source,
            pending: BytesMut::with_capacity(CHUNK),
            config,
            decoder: Decoder::default(),
        }
    }

    /// Use `decoder` for [`read_term`](Self::read_term).
    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Block until one whole frame body is buffered and return it.
    ///
    /// EOF, including EOF partway through a frame, is
    /// [`FrameError::ConnectionClosed`].
    pub fn read_frame(&mut self) -> Result<Bytes> {
        let limit = self.config.max_payload_size;
        loop {
            match decode_frame(&mut self.pending, limit)? {
                Some(body) => return Ok(body),
                None => self.fill()?,
            }
        }
    }

    /// Read one frame and decode its body.
    ///
    /// An undecodable body is reported as [`FrameError::Codec`] after the
    /// frame is consumed, so the stream stays aligned.
    pub fn read_term(&mut self) -> Result<Term> {
        let body = self.read_frame()?;
        self.decoder.decode(&body).map_err(FrameError::from)
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; CHUNK];
        loop {
            match self.source.read(&mut chunk) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.source
    }

    pub fn into_inner(self) -> T {
        self.source
    }

    /// Applies to frames whose header has not been read yet.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<BertStream> {
    /// Wrap a connected stream, applying `config.read_timeout` to it.
    pub fn for_stream(stream: BertStream, config: FrameConfig) -> Result<Self> {
        stream.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(stream, config))
    }
}
