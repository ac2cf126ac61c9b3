/// Errors produced by a single encode or decode call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// The input bytes are not a well-formed BERT term.
    #[error("malformed term: {0}")]
    MalformedTerm(#[from] Malformed),

    /// A value cannot be represented in the fixed width its encoding requires.
    #[error("value out of range for encoding: {0}")]
    EncodeRange(String),
}

/// Specific reasons a byte sequence failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Malformed {
    /// No bytes at all.
    #[error("empty input")]
    Empty,

    /// The first byte is not the 131 version byte.
    #[error("expected start byte 131, found {0}")]
    BadStart(u8),

    /// A term begins with a tag this codec does not understand.
    #[error("unrecognized tag byte {0}")]
    UnknownTag(u8),

    /// A length or payload runs past the end of the input.
    #[error("truncated {what}: need {needed} bytes, {available} available")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// A LIST was not followed by the NIL tag.
    #[error("list not terminated by NIL (found {0:?})")]
    MissingNil(Option<u8>),

    /// Bytes remain after a complete top-level term.
    #[error("{0} trailing bytes after term")]
    TrailingBytes(usize),

    /// A FLOAT payload is not parseable ASCII.
    #[error("invalid float text {0:?}")]
    InvalidFloat(String),

    /// `{bert, dict, X}` where X is not a list of 2-tuples.
    #[error("invalid dictionary payload")]
    InvalidDictionary,

    /// Nesting exceeded the decoder's depth limit.
    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),
}

pub type Result<T> = std::result::Result<T, CodecError>;
