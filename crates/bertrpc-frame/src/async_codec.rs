//! `tokio_util::codec` adapter for BERP framing.

use bertrpc_term::{CodecError, Decoder, Encoder, Term};
use bytes::BytesMut;

use crate::codec::{decode_frame, encode_term_frame, DEFAULT_MAX_PAYLOAD};
use crate::error::FrameError;

/// Frames terms on an async byte stream via `Framed`.
///
/// Each decoded item is itself a `Result`: a body that is not a valid term
/// is yielded as `Err(CodecError)` and the stream keeps going. Only framing
/// and I/O failures end the stream.
#[derive(Debug, Clone)]
pub struct BerpCodec {
    max_payload: usize,
    encoder: Encoder,
    decoder: Decoder,
}

impl Default for BerpCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl BerpCodec {
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            max_payload,
            encoder: Encoder::default(),
            decoder: Decoder::default(),
        }
    }

    pub fn with_encoder(mut self, encoder: Encoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }
}

impl tokio_util::codec::Decoder for BerpCodec {
    type Item = Result<Term, CodecError>;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(decode_frame(src, self.max_payload)?.map(|body| self.decoder.decode(&body)))
    }
}

impl tokio_util::codec::Encoder<Term> for BerpCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Term, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_term_frame(&self.encoder, &item, dst, self.max_payload)
    }
}

impl tokio_util::codec::Encoder<&Term> for BerpCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Term, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_term_frame(&self.encoder, item, dst, self.max_payload)
    }
}
