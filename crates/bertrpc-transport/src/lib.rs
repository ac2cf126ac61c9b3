//! Byte-stream transports for BERT-RPC.
//!
//! BERT-RPC runs over any bidirectional, ordered byte stream. This crate
//! provides the two that matter in practice:
//! - TCP (the historical BERT-RPC transport)
//! - Unix domain sockets (Linux/macOS)
//!
//! This is the lowest layer of bertrpc. Framing and dispatch build on the
//! [`BertStream`] type provided here.

pub mod endpoint;
pub mod error;
pub mod listener;
pub mod stream;
pub mod tcp;

#[cfg(unix)]
pub mod uds;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use listener::{connect, BertListener};
pub use stream::BertStream;
pub use tcp::TcpTransport;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
