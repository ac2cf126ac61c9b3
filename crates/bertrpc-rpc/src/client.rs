use std::io::{ErrorKind, Read};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bertrpc_frame::{FrameConfig, FrameWriter, Framer};
use bertrpc_term::{Encoder, Term};
use bertrpc_transport::{BertStream, Endpoint};
use tracing::{debug, warn};

use crate::correlator::{reply_result, Correlator, ReplyHandler};
use crate::envelope::Request;
use crate::error::{Result, RpcError};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Client behavior knobs.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Framing limits; `write_timeout` applies to request writes. Replies
    /// are read without a socket timeout; use `call_timeout` instead.
    pub frame: FrameConfig,
    /// Encoder used for requests (selects the protocol generation).
    pub encoder: Encoder,
    /// Deadline applied by [`Client::call`]. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_encoder(mut self, encoder: Encoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }
}

struct Shared {
    writer: Mutex<FrameWriter<BertStream>>,
    correlator: Mutex<Correlator>,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Blocking, pipelined BERT-RPC client.
///
/// Requests may be issued from several threads at once; replies are
/// matched to requests by arrival order. A background thread reads replies
/// and resolves pending requests; when the connection ends, every request
/// still waiting fails with [`RpcError::TransportClosed`].
pub struct Client {
    shared: Arc<Shared>,
    stream: BertStream,
    config: ClientConfig,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Connect to a server.
    pub fn connect(endpoint: &Endpoint) -> Result<Self> {
        Self::connect_with_config(endpoint, ClientConfig::default())
    }

    /// Connect with explicit configuration.
    pub fn connect_with_config(endpoint: &Endpoint, config: ClientConfig) -> Result<Self> {
        let stream = bertrpc_transport::connect(endpoint)?;
        Self::from_stream(stream, config)
    }

    /// Run the client over an already-connected stream.
    pub fn from_stream(stream: BertStream, config: ClientConfig) -> Result<Self> {
        let reader_stream = stream.try_clone()?;
        let control = stream.try_clone()?;
        let writer = FrameWriter::for_stream(stream, config.frame.clone())?
            .with_encoder(config.encoder.clone());

        let shared = Arc::new(Shared {
            writer: Mutex::new(writer),
            correlator: Mutex::new(Correlator::new()),
        });

        let reader_shared = Arc::clone(&shared);
        let max_payload = config.frame.max_payload_size;
        let reader = thread::Builder::new()
            .name("bertrpc-client-reader".to_string())
            .spawn(move || read_replies(reader_stream, &reader_shared, max_payload))
            .map_err(bertrpc_transport::TransportError::Io)?;

        Ok(Self {
            shared,
            stream: control,
            config,
            reader: Mutex::new(Some(reader)),
        })
    }

    /// Send a request; `handler` runs on the reader thread with its outcome.
    pub fn call_with<F>(&self, request: &Request, handler: F) -> Result<()>
    where
        F: FnOnce(Result<Term>) + Send + 'static,
    {
        self.submit(request, Box::new(handler))
    }

    /// Send a call and return a handle to its eventual reply.
    pub fn send(&self, request: &Request) -> Result<PendingReply> {
        let (tx, rx) = mpsc::channel();
        self.submit(
            request,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )?;
        Ok(PendingReply { rx })
    }

    /// Call `module:function(args)` and wait for the result, honouring the
    /// configured call timeout.
    pub fn call(&self, module: &str, function: &str, args: Vec<Term>) -> Result<Term> {
        let pending = self.send(&Request::call(module, function, args))?;
        match self.config.call_timeout {
            Some(timeout) => pending.wait_timeout(timeout),
            None => pending.wait(),
        }
    }

    /// Fire-and-forget `module:function(args)`.
    ///
    /// The server still acknowledges the cast with `{noreply}` (or an
    /// error reply), which is consumed and logged here to keep later
    /// replies aligned.
    pub fn cast(&self, module: &str, function: &str, args: Vec<Term>) -> Result<()> {
        let request = Request::cast(module, function, args);
        let label = request.to_string();
        self.call_with(&request, move |result| match result {
            Ok(_) => debug!(request = %label, "cast acknowledged"),
            Err(err) => warn!(request = %label, error = %err, "cast failed"),
        })
    }

    /// A handle bound to one remote module.
    pub fn module<'a>(&'a self, name: &'a str) -> ModuleHandle<'a> {
        ModuleHandle { client: self, name }
    }

    /// Requests written but not yet answered.
    pub fn pending(&self) -> usize {
        lock(&self.shared.correlator).pending()
    }

    /// Close the connection. Pending requests fail with `TransportClosed`.
    pub fn close(&self) {
        if let Err(err) = self.stream.shutdown() {
            debug!(error = %err, "client shutdown failed");
        }
        if let Some(reader) = lock(&self.reader).take() {
            if reader.join().is_err() {
                warn!("client reader thread panicked");
            }
        }
        lock(&self.shared.correlator).close();
    }

    fn submit(&self, request: &Request, handler: ReplyHandler) -> Result<()> {
        let term = request.to_term();
        // The writer lock orders enqueue+write across threads, so queue
        // order always equals wire order.
        let mut writer = lock(&self.shared.writer);
        lock(&self.shared.correlator).push(handler)?;
        if let Err(err) = writer.write_term(&term) {
            drop(lock(&self.shared.correlator).pop_back());
            return Err(err.into());
        }
        debug!(request = %request, "request sent");
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reader thread: feed inbound bytes through a framer and resolve pending
/// requests in order, then fail whatever is left when the stream ends.
fn read_replies(mut stream: BertStream, shared: &Shared, max_payload: usize) {
    let mut framer = Framer::with_max_payload(max_payload);
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let read = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                debug!(error = %err, "client read failed");
                break;
            }
        };

        let fed = framer.feed(&chunk[..read], |_, decoded| {
            let handler = lock(&shared.correlator).take_head();
            match handler {
                Some(handler) => handler(reply_result(decoded)),
                None => warn!("reply received with no pending request; dropped"),
            }
        });
        if let Err(err) = fed {
            warn!(error = %err, "reply stream unrecoverable");
            break;
        }
    }

    let failed = lock(&shared.correlator).close();
    debug!(failed, "client reader finished");
}

/// A request awaiting its reply.
#[derive(Debug)]
pub struct PendingReply {
    rx: mpsc::Receiver<Result<Term>>,
}

impl PendingReply {
    /// Block until the reply arrives or the connection closes.
    pub fn wait(self) -> Result<Term> {
        self.rx.recv().unwrap_or(Err(RpcError::TransportClosed))
    }

    /// Block for at most `timeout`.
    ///
    /// On timeout the request stays queued, so a late reply is consumed
    /// and discarded without shifting later replies.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Term> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(RpcError::Timeout(timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(RpcError::TransportClosed),
        }
    }
}

/// `client.module("math").call("sum", args)`.
#[derive(Clone, Copy)]
pub struct ModuleHandle<'a> {
    client: &'a Client,
    name: &'a str,
}

impl ModuleHandle<'_> {
    pub fn call(&self, function: &str, args: Vec<Term>) -> Result<Term> {
        self.client.call(self.name, function, args)
    }

    pub fn cast(&self, function: &str, args: Vec<Term>) -> Result<()> {
        self.client.cast(self.name, function, args)
    }

    pub fn name(&self) -> &str {
        self.name
    }
}
