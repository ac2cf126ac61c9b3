use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use bertrpc_term::{CodecError, Term};
use tracing::{debug, warn};

use crate::envelope::{CallKind, RemoteError, Reply, Request};
use crate::error::{CallError, Result, RpcError};
use crate::registry::ModuleRegistry;

/// Routes requests to exposed functions and builds reply terms.
///
/// Every request frame gets exactly one reply frame: `{reply, V}` for a
/// call, `{noreply}` for a cast, `{error, ...}` for any failure. Clients
/// match replies to requests by order alone, so skipping a reply would
/// misattribute every later one.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ModuleRegistry>,
}

impl Dispatcher {
    pub fn new(registry: impl Into<Arc<ModuleRegistry>>) -> Self {
        Self {
            registry: registry.into(),
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Invoke the function named by `request` and return its result.
    ///
    /// Lookup failures happen before anything runs. A panicking function
    /// is reported as a `CallError` instead of unwinding into the caller.
    pub fn dispatch(&self, request: &Request) -> Result<Term> {
        let function = self.registry.lookup(&request.module, &request.function)?;
        let args = request.args.clone();
        match catch_unwind(AssertUnwindSafe(|| function(args))) {
            Ok(result) => Ok(result?),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "function panicked".to_string());
                Err(CallError::with_class("Panic", message).into())
            }
        }
    }

    /// Turn one decoded request term into its reply.
    pub fn handle(&self, term: Term) -> Reply {
        let request = match Request::from_term(term) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "rejecting malformed request");
                return Reply::Error(RemoteError::from_rpc_error(&err));
            }
        };

        debug!(request = %request, "dispatching");
        match (self.dispatch(&request), request.kind) {
            (Ok(value), CallKind::Call) => Reply::Value(value),
            (Ok(_), CallKind::Cast) => Reply::NoReply,
            (Err(err), _) => {
                warn!(request = %request, error = %err, "request failed");
                Reply::Error(RemoteError::from_rpc_error(&err))
            }
        }
    }

    /// Build the reply term for one inbound frame, including frames whose
    /// body failed to decode.
    pub fn handle_frame(&self, decoded: std::result::Result<Term, CodecError>) -> Term {
        match decoded {
            Ok(term) => self.handle(term).to_term(),
            Err(err) => {
                warn!(error = %err, "undecodable request frame");
                Reply::Error(RemoteError::from_rpc_error(&RpcError::Codec(err))).to_term()
            }
        }
    }
}
