//! FIFO reply matching for pipelined requests.
//!
//! BERT-RPC carries no request identifiers: the n-th reply on a connection
//! answers the n-th request. The correlator keeps one handler per
//! outstanding request and resolves them strictly in submission order.

use std::collections::VecDeque;

use bertrpc_term::{CodecError, Term};
use tracing::{debug, warn};

use crate::envelope::Reply;
use crate::error::{Result, RpcError};

/// Receives the outcome of one request.
pub type ReplyHandler = Box<dyn FnOnce(Result<Term>) + Send>;

/// Ordered queue of pending reply handlers.
#[derive(Default)]
pub struct Correlator {
    pending: VecDeque<ReplyHandler>,
    closed: bool,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a handler for the request about to be written.
    ///
    /// Fails with `TransportClosed` once [`close`](Self::close) has run, so
    /// nothing can wait on a connection that will never answer.
    pub fn push(&mut self, handler: ReplyHandler) -> Result<()> {
        if self.closed {
            return Err(RpcError::TransportClosed);
        }
        self.pending.push_back(handler);
        Ok(())
    }

    /// Withdraw the most recently queued handler (its request was never
    /// written).
    pub fn pop_back(&mut self) -> Option<ReplyHandler> {
        self.pending.pop_back()
    }

    /// Dequeue the handler owed the next reply.
    ///
    /// Callers that must not run handlers under a lock take the handler
    /// here and resolve it with [`reply_result`] afterwards.
    pub fn take_head(&mut self) -> Option<ReplyHandler> {
        self.pending.pop_front()
    }

    /// Resolve the head handler with one inbound reply frame.
    ///
    /// Returns `false` when no request was pending; the reply is dropped.
    pub fn on_term(&mut self, decoded: std::result::Result<Term, CodecError>) -> bool {
        match self.take_head() {
            Some(handler) => {
                handler(reply_result(decoded));
                true
            }
            None => {
                warn!("reply received with no pending request; dropped");
                false
            }
        }
    }

    /// Resolve every pending handler with `TransportClosed` and refuse new
    /// ones. Returns how many were pending.
    pub fn close(&mut self) -> usize {
        self.closed = true;
        let count = self.pending.len();
        if count > 0 {
            debug!(count, "failing pending requests on close");
        }
        for handler in self.pending.drain(..) {
            handler(Err(RpcError::TransportClosed));
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &self.pending.len())
            .field("closed", &self.closed)
            .finish()
    }
}

/// Interpret one reply frame from the caller's point of view.
pub fn reply_result(decoded: std::result::Result<Term, CodecError>) -> Result<Term> {
    Reply::from_term(decoded?)?.into_result()
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use bertrpc_term::Malformed;

    use super::*;
    use crate::envelope::RemoteError;

    fn recorder() -> (ReplyHandler, mpsc::Receiver<Result<Term>>) {
        let (tx, rx) = mpsc::channel();
        let handler: ReplyHandler = Box::new(move |result| {
            let _ = tx.send(result);
        });
        (handler, rx)
    }

    fn reply(value: Term) -> std::result::Result<Term, CodecError> {
        Ok(Reply::Value(value).to_term())
    }

    #[test]
    fn resolves_in_submission_order() {
        let mut correlator = Correlator::new();
        let receivers: Vec<_> = (0..3)
            .map(|_| {
                let (handler, rx) = recorder();
                correlator.push(handler).unwrap();
                rx
            })
            .collect();

        for n in 0..3 {
            assert!(correlator.on_term(reply(Term::Integer(n))));
        }
        for (n, rx) in receivers.iter().enumerate() {
            assert_eq!(rx.recv().unwrap().unwrap(), Term::Integer(n as i64));
        }
        assert_eq!(correlator.pending(), 0);
    }

    #[test]
    fn identical_replies_still_match_by_position() {
        let mut correlator = Correlator::new();
        let (first, rx1) = recorder();
        let (second, rx2) = recorder();
        correlator.push(first).unwrap();
        correlator.push(second).unwrap();

        correlator.on_term(reply(Term::atom("ok")));
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
        correlator.on_term(reply(Term::atom("ok")));
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn noreply_resolves_to_empty_list() {
        let mut correlator = Correlator::new();
        let (handler, rx) = recorder();
        correlator.push(handler).unwrap();
        correlator.on_term(Ok(Reply::NoReply.to_term()));
        assert_eq!(rx.recv().unwrap().unwrap(), Term::Nil);
    }

    #[test]
    fn error_reply_resolves_remote_error() {
        let mut correlator = Correlator::new();
        let (handler, rx) = recorder();
        correlator.push(handler).unwrap();
        correlator.on_term(Ok(Reply::Error(RemoteError::server(1, "no such module")).to_term()));
        assert!(matches!(rx.recv().unwrap(), Err(RpcError::Remote(e)) if e.code == 1));
    }

    #[test]
    fn undecodable_reply_consumes_one_handler() {
        let mut correlator = Correlator::new();
        let (first, rx1) = recorder();
        let (second, rx2) = recorder();
        correlator.push(first).unwrap();
        correlator.push(second).unwrap();

        correlator.on_term(Err(Malformed::UnknownTag(1).into()));
        correlator.on_term(reply(Term::Integer(2)));
        assert!(matches!(rx1.recv().unwrap(), Err(RpcError::Codec(_))));
        assert_eq!(rx2.recv().unwrap().unwrap(), Term::Integer(2));
    }

    #[test]
    fn unsolicited_reply_is_dropped() {
        let mut correlator = Correlator::new();
        assert!(!correlator.on_term(reply(Term::Nil)));
    }

    #[test]
    fn close_fails_everything_pending() {
        let mut correlator = Correlator::new();
        let (a, rx_a) = recorder();
        let (b, rx_b) = recorder();
        correlator.push(a).unwrap();
        correlator.push(b).unwrap();

        assert_eq!(correlator.close(), 2);
        assert!(matches!(rx_a.recv().unwrap(), Err(RpcError::TransportClosed)));
        assert!(matches!(rx_b.recv().unwrap(), Err(RpcError::TransportClosed)));

        let (late, _rx) = recorder();
        assert!(matches!(correlator.push(late), Err(RpcError::TransportClosed)));
        assert!(correlator.is_closed());
    }

    #[test]
    fn pop_back_withdraws_latest() {
        let mut correlator = Correlator::new();
        let (a, rx_a) = recorder();
        let (b, rx_b) = recorder();
        correlator.push(a).unwrap();
        correlator.push(b).unwrap();

        drop(correlator.pop_back());
        correlator.on_term(reply(Term::Integer(1)));
        assert_eq!(rx_a.recv().unwrap().unwrap(), Term::Integer(1));
        assert!(rx_b.recv().is_err());
    }
}
