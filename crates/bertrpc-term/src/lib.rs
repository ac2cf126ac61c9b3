//! BERT term model and binary codec.
//!
//! BERT is the subset of Erlang's external term format used by BERT-RPC.
//! Every encoded value starts with the version byte 131 followed by one
//! tagged term:
//! - atoms, binaries, bytelists
//! - small/32-bit integers and sign+magnitude bignums
//! - 31-byte ASCII floats
//! - lists, tuples, and the `{bert, ...}` complex types
//!   (booleans, null, dictionaries)
//!
//! Encoding and decoding are pure transforms over byte buffers; no I/O
//! happens in this crate.

pub mod decode;
pub mod encode;
pub mod error;
pub mod float;
pub mod int;
pub mod tag;
pub mod term;

pub use decode::{decode, decode_partial, DecodeConfig, Decoder, DEFAULT_MAX_DEPTH};
pub use encode::{encode, encode_into, EncodeConfig, Encoder, Generation};
pub use error::{CodecError, Malformed, Result};
pub use int::{bignum_to_bytes, bytes_to_bignum, bytes_to_int, int_to_bytes};
pub use num_bigint::BigInt;
pub use term::{Atom, Dictionary, Term};
