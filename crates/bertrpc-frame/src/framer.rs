//! Chunk-fed BERP frame splitter.
//!
//! A [`Framer`] accepts arbitrary chunks of a byte stream (as they arrive
//! from a socket) and hands each complete frame, decoded, to a consumer.
//! Chunk boundaries never matter: one chunk may carry many frames, and a
//! frame may span many chunks.

use bertrpc_term::{CodecError, Decoder, Term};
use bytes::{Buf, BytesMut};
use tracing::{debug, warn};

use crate::codec::{peek_length, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Where the framer is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// Fewer than four header bytes are buffered.
    AwaitingLength,
    /// The header has been read; waiting for this many body bytes.
    AwaitingBody(usize),
    /// A header declared an oversized body. Nothing more is buffered.
    Failed { size: usize, max: usize },
}

/// Incremental frame splitter and decoder.
#[derive(Debug)]
pub struct Framer {
    buf: BytesMut,
    state: FramerState,
    max_payload: usize,
    decoder: Decoder,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer {
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            state: FramerState::AwaitingLength,
            max_payload,
            decoder: Decoder::default(),
        }
    }

    /// Replace the term decoder (for custom depth limits).
    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    /// Bytes received but not yet part of a delivered frame.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Append `chunk` and deliver every frame it completes, in order.
    ///
    /// `consumer` receives the body length and the decode result for each
    /// frame; a body that fails to decode is still consumed, so framing
    /// continues with the next frame. Returns the number of frames
    /// delivered. A declared length above the maximum is fatal: the error
    /// is returned now and on every later call, and later chunks are
    /// discarded.
    pub fn feed<F>(&mut self, chunk: &[u8], mut consumer: F) -> Result<usize>
    where
        F: FnMut(usize, std::result::Result<Term, CodecError>),
    {
        if let FramerState::Failed { size, max } = self.state {
            return Err(FrameError::PayloadTooLarge { size, max });
        }
        self.buf.extend_from_slice(chunk);
        let mut delivered = 0;

        loop {
            match self.state {
                FramerState::Failed { size, max } => {
                    return Err(FrameError::PayloadTooLarge { size, max });
                }
                FramerState::AwaitingLength => {
                    let len = match peek_length(&self.buf, self.max_payload) {
                        Ok(Some(len)) => len,
                        Ok(None) => break,
                        Err(err) => {
                            if let FrameError::PayloadTooLarge { size, max } = err {
                                warn!(size, max, "oversized frame header; framer stopped");
                                self.state = FramerState::Failed { size, max };
                                self.buf = BytesMut::new();
                            }
                            return Err(err);
                        }
                    };
                    self.buf.advance(HEADER_SIZE);
                    self.state = FramerState::AwaitingBody(len);
                }
                FramerState::AwaitingBody(len) => {
                    if self.buf.len() < len {
                        break;
                    }
                    let body = self.buf.split_to(len);
                    self.state = FramerState::AwaitingLength;

                    let decoded = self.decoder.decode(&body);
                    match &decoded {
                        Ok(_) => debug!(len, "frame decoded"),
                        Err(err) => warn!(len, error = %err, "frame body failed to decode"),
                    }
                    consumer(len, decoded);
                    delivered += 1;
                }
            }
        }

        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use bertrpc_term::{encode, Malformed};
    use bytes::BufMut;

    use super::*;
    use crate::codec::encode_frame;
    use crate::error::FrameError;

    fn frame(term: &Term) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(&encode(term).unwrap(), &mut buf).unwrap();
        buf.to_vec()
    }

    fn collect(framer: &mut Framer, chunk: &[u8]) -> Vec<(usize, std::result::Result<Term, CodecError>)> {
        let mut out = Vec::new();
        framer
            .feed(chunk, |len, result| out.push((len, result)))
            .unwrap();
        out
    }

    #[test]
    fn single_frame_single_chunk() {
        let mut framer = Framer::new();
        let got = collect(&mut framer, &[0, 0, 0, 3, 131, 97, 42]);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].0, 3);
        assert_eq!(got[0].1, Ok(Term::Integer(42)));
        assert_eq!(framer.state(), FramerState::AwaitingLength);
        assert!(framer.buffered().is_empty());
    }

    #[test]
    fn three_frames_one_chunk() {
        let terms = [Term::atom("a"), Term::Integer(42), Term::from("hello")];
        let wire: Vec<u8> = terms.iter().flat_map(frame).collect();

        let mut framer = Framer::new();
        let got = collect(&mut framer, &wire);
        assert_eq!(
            got,
            vec![
                (5, Ok(Term::atom("a"))),
                (3, Ok(Term::Integer(42))),
                (11, Ok(Term::from("hello"))),
            ]
        );
        assert!(framer.buffered().is_empty());
    }

    #[test]
    fn byte_at_a_time() {
        let term = Term::tuple([Term::atom("reply"), Term::from("hello")]);
        let wire = frame(&term);

        let mut framer = Framer::new();
        let mut got = Vec::new();
        for (i, byte) in wire.iter().enumerate() {
            got.extend(collect(&mut framer, std::slice::from_ref(byte)));
            if i < HEADER_SIZE - 1 {
                assert_eq!(framer.state(), FramerState::AwaitingLength);
            } else if i < wire.len() - 1 {
                assert_eq!(
                    framer.state(),
                    FramerState::AwaitingBody(wire.len() - HEADER_SIZE)
                );
            }
        }
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].1, Ok(term));
    }

    #[test]
    fn split_across_arbitrary_chunks() {
        let mut wire = Vec::new();
        for n in 0..20 {
            wire.extend(frame(&Term::Integer(n * 1000)));
        }

        let mut framer = Framer::new();
        let mut got = Vec::new();
        for chunk in wire.chunks(7) {
            got.extend(collect(&mut framer, chunk));
        }
        let values: Vec<_> = got.into_iter().map(|(_, t)| t.unwrap()).collect();
        let expected: Vec<_> = (0..20).map(|n| Term::Integer(n * 1000)).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn bad_body_does_not_break_framing() {
        let mut wire = BytesMut::new();
        encode_frame(&[131, 200], &mut wire).unwrap();
        wire.put_slice(&frame(&Term::atom("ok")));

        let mut framer = Framer::new();
        let got = collect(&mut framer, &wire);
        assert_eq!(got.len(), 2);
        assert_eq!(
            got[0].1,
            Err(CodecError::MalformedTerm(Malformed::UnknownTag(200)))
        );
        assert_eq!(got[1].1, Ok(Term::atom("ok")));
    }

    #[test]
    fn zero_length_frame_is_decode_error() {
        let mut framer = Framer::new();
        let got = collect(&mut framer, &[0, 0, 0, 0]);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].0, 0);
        assert_eq!(got[0].1, Err(CodecError::MalformedTerm(Malformed::Empty)));
    }

    #[test]
    fn leftover_bytes_are_buffered() {
        let mut wire = frame(&Term::Integer(1));
        wire.extend_from_slice(&[0, 0]);

        let mut framer = Framer::new();
        assert_eq!(collect(&mut framer, &wire).len(), 1);
        assert_eq!(framer.buffered(), &[0, 0]);
        assert_eq!(framer.state(), FramerState::AwaitingLength);
    }

    #[test]
    fn oversized_length_is_fatal() {
        let mut framer = Framer::with_max_payload(8);
        let mut calls = 0;
        let err = framer
            .feed(&[0, 0, 1, 0], |_, _| calls += 1)
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 256, max: 8 }));
        assert_eq!(framer.state(), FramerState::Failed { size: 256, max: 8 });
        assert!(framer.feed(&[], |_, _| calls += 1).is_err());
        assert_eq!(calls, 0);
    }

    #[test]
    fn failed_framer_stops_buffering() {
        let mut framer = Framer::with_max_payload(8);
        assert!(framer.feed(&[0, 0, 1, 0, 131], |_, _| {}).is_err());
        for _ in 0..4 {
            let err = framer.feed(&[0u8; 4096], |_, _| {}).unwrap_err();
            assert!(matches!(err, FrameError::PayloadTooLarge { size: 256, max: 8 }));
        }
        assert!(framer.buffered().is_empty());
    }
}
