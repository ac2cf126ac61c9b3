//! BERP framing: length-prefixed BERT terms on a byte stream.
//!
//! Every packet is a 4-byte big-endian length followed by exactly that many
//! bytes of one encoded term. This crate provides:
//! - the header codec ([`encode_frame`], [`decode_frame`])
//! - a chunk-fed [`Framer`] state machine for event-driven readers
//! - blocking [`FrameReader`]/[`FrameWriter`] adapters
//! - a `tokio_util` [`BerpCodec`] (feature `async`)
//!
//! A body that fails to decode never desynchronizes the stream; only an
//! oversized declared length does.

pub mod codec;
pub mod error;
pub mod framer;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::BerpCodec;
pub use codec::{
    decode_frame, encode_frame, encode_term_frame, peek_length, FrameConfig, DEFAULT_MAX_PAYLOAD,
    HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use framer::{Framer, FramerState};
pub use reader::FrameReader;
pub use writer::FrameWriter;
