//! BERT-RPC over BERP framing.
//!
//! A request is `{call, Module, Function, Args}` or `{cast, Module,
//! Function, Args}`; the answer is `{reply, Value}`, `{noreply}` or
//! `{error, {Type, Code, Class, Detail, Backtrace}}`. Requests carry no
//! identifiers, so a connection answers them strictly in order and a
//! client matches replies by position alone.
//!
//! Server side: register functions in a [`ModuleRegistry`] and run a
//! [`Server`]. Client side: [`Client`] pipelines requests over one
//! connection. With feature `async`, [`AsyncServer`] and [`AsyncClient`]
//! do the same on tokio.

pub mod client;
pub mod correlator;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod server;

#[cfg(feature = "async")]
pub mod async_client;
#[cfg(feature = "async")]
pub mod async_server;

#[cfg(feature = "async")]
pub use async_client::AsyncClient;
#[cfg(feature = "async")]
pub use async_server::AsyncServer;
pub use client::{Client, ClientConfig, ModuleHandle, PendingReply};
pub use correlator::{reply_result, Correlator, ReplyHandler};
pub use dispatcher::Dispatcher;
pub use envelope::{
    CallKind, ErrorType, RemoteError, Reply, Request, PROTOCOL_BAD_ENVELOPE,
    PROTOCOL_DECODE_FAILED, SERVER_NO_SUCH_FUNCTION, SERVER_NO_SUCH_MODULE, SERVER_UNDESIGNATED,
    USER_CALL_FAILED,
};
pub use error::{CallError, Result, RpcError};
pub use registry::{Function, Module, ModuleRegistry};
pub use server::{serve_connection, Server, ServerConfig, ShutdownHandle};
