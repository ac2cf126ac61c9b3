use std::io;

use bertrpc_frame::FrameError;
use bertrpc_rpc::RpcError;
use bertrpc_term::CodecError;
use bertrpc_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
/// The server answered with an `{error, ...}` reply.
pub const REMOTE_ERROR: i32 = 65;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

/// A failed command: the process exit code plus the line printed to stderr.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::NotFound
        | io::ErrorKind::PermissionDenied
        | io::ErrorKind::AddrInUse => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidEndpoint(_) => CliError::usage(format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn codec_error(context: &str, err: CodecError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::Codec(err) => codec_error(context, err),
        FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn rpc_error(context: &str, err: RpcError) -> CliError {
    match err {
        RpcError::Transport(err) => transport_error(context, err),
        RpcError::Frame(err) => frame_error(context, err),
        RpcError::Codec(err) => codec_error(context, err),
        RpcError::Remote(_) => CliError::new(REMOTE_ERROR, format!("{context}: {err}")),
        RpcError::InvalidEnvelope(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        RpcError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        RpcError::TransportClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}
