//! BERT serialization and BERT-RPC.
//!
//! BERT is the binary subset of Erlang's external term format; BERT-RPC is
//! a small request/reply protocol that carries BERT terms over BERP
//! (4-byte length-prefixed) framing.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-stream endpoints (Unix domain sockets, TCP)
//! - [`term`]: the term model and the BERT codec
//! - [`frame`]: BERP framing
//! - [`rpc`]: dispatcher, server and pipelined client (behind `rpc` feature)
//! - [`demos`]: the sample `math`, `echo` and `say` modules

/// Re-export transport types.
pub mod transport {
    pub use bertrpc_transport::*;
}

/// Re-export term types.
pub mod term {
    pub use bertrpc_term::*;
}

/// Re-export frame types.
pub mod frame {
    pub use bertrpc_frame::*;
}

/// Re-export RPC types (requires `rpc` feature).
#[cfg(feature = "rpc")]
pub mod rpc {
    pub use bertrpc_rpc::*;
}

#[cfg(feature = "rpc")]
pub mod demos;

pub use bertrpc_term::{decode, encode, Term};
