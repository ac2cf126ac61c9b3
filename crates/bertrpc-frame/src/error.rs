use bertrpc_term::CodecError;
use bertrpc_transport::TransportError;

/// Errors that can occur while framing terms on a byte stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A frame declared (or would need) a body larger than the configured
    /// maximum. Fatal: the stream cannot be resynchronized.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The frame body was read completely but is not a valid term.
    /// The stream is still aligned on a frame boundary.
    #[error("frame body: {0}")]
    Codec(#[from] CodecError),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether the stream may still be read after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::Codec(_))
    }
}

impl From<TransportError> for FrameError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(io) | TransportError::Accept(io) => FrameError::Io(io),
            TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
                FrameError::Io(source)
            }
            other => FrameError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
