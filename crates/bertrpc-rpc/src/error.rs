use std::time::Duration;

use crate::envelope::RemoteError;

/// Failure raised by an exposed function.
///
/// Reported to the caller as a `user` error reply carrying `class` and
/// `message`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{class}: {message}")]
pub struct CallError {
    pub class: String,
    pub message: String,
}

impl CallError {
    /// An error with the generic `RuntimeError` class.
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_class("RuntimeError", message)
    }

    pub fn with_class(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
        }
    }

    /// An `ArgumentError` for arguments of the wrong shape or type.
    pub fn bad_args(message: impl Into<String>) -> Self {
        Self::with_class("ArgumentError", message)
    }
}

/// Errors that can occur in RPC operations.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] bertrpc_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] bertrpc_frame::FrameError),

    /// A term could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] bertrpc_term::CodecError),

    /// The requested module is not exposed.
    #[error("no such module '{0}'")]
    NoSuchModule(String),

    /// The module exists but has no such function.
    #[error("no such function '{module}:{function}'")]
    NoSuchFunction { module: String, function: String },

    /// The exposed function returned an error.
    #[error("call failed: {0}")]
    Call(#[from] CallError),

    /// A request or reply term does not have the BERT-RPC envelope shape.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// The peer answered with an error reply.
    #[error("remote error: {0}")]
    Remote(RemoteError),

    /// The connection ended while the request was outstanding.
    #[error("transport closed")]
    TransportClosed,

    /// No reply arrived within the caller's deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, RpcError>;
