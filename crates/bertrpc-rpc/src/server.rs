use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bertrpc_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use bertrpc_term::Encoder;
use bertrpc_transport::{BertListener, BertStream, Endpoint};
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::envelope::Reply;
use crate::error::Result;
use crate::registry::ModuleRegistry;

/// Server behavior knobs.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Framing limits and per-connection socket timeouts.
    pub frame: FrameConfig,
    /// Encoder used for replies (selects the protocol generation).
    pub encoder: Encoder,
}

impl ServerConfig {
    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_encoder(mut self, encoder: Encoder) -> Self {
        self.encoder = encoder;
        self
    }
}

/// Blocking BERT-RPC server: one thread per connection.
pub struct Server {
    listener: BertListener,
    dispatcher: Dispatcher,
    config: ServerConfig,
    shutdown: Arc<AtomicBool>,
    next_conn_id: AtomicU64,
}

/// Stops a [`Server::serve`] loop from another thread.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    endpoint: Endpoint,
}

impl ShutdownHandle {
    /// Ask the accept loop to exit. Wakes a blocked `accept` by connecting
    /// to the listener once.
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = bertrpc_transport::connect(&self.endpoint) {
            debug!(error = %err, "shutdown wake-up connect failed");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Server {
    /// Bind to `endpoint` and serve the modules in `registry`.
    pub fn bind(endpoint: &Endpoint, registry: impl Into<Arc<ModuleRegistry>>) -> Result<Self> {
        let listener = BertListener::bind(endpoint)?;
        info!(endpoint = %listener.local_endpoint(), "server listening");
        Ok(Self {
            listener,
            dispatcher: Dispatcher::new(registry),
            config: ServerConfig::default(),
            shutdown: Arc::new(AtomicBool::new(false)),
            next_conn_id: AtomicU64::new(1),
        })
    }

    /// Override server config.
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// The bound endpoint (with the real port for `:0` TCP binds).
    pub fn local_endpoint(&self) -> Endpoint {
        self.listener.local_endpoint()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            endpoint: self.local_endpoint(),
        }
    }

    /// Accept one connection and serve it on a new thread.
    pub fn accept_one(&self) -> Result<JoinHandle<()>> {
        let stream = self.listener.accept()?;
        let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let peer = stream.peer_label();
        info!(conn = id, peer = %peer, "connection accepted");

        let dispatcher = self.dispatcher.clone();
        let config = self.config.clone();
        let handle = thread::Builder::new()
            .name(format!("bertrpc-conn-{id}"))
            .spawn(move || match serve_connection(stream, &dispatcher, &config) {
                Ok(served) => info!(conn = id, served, "connection closed"),
                Err(err) => warn!(conn = id, error = %err, "connection failed"),
            })
            .map_err(bertrpc_transport::TransportError::Io)?;
        Ok(handle)
    }

    /// Accept connections until [`ShutdownHandle::shutdown`] is called.
    pub fn serve(&self) -> Result<()> {
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.accept_one() {
                Ok(_) => {}
                Err(err) if self.shutdown.load(Ordering::SeqCst) => {
                    debug!(error = %err, "accept interrupted by shutdown");
                }
                Err(err) => warn!(error = %err, "accept failed"),
            }
        }
        info!("server stopped");
        Ok(())
    }
}

/// Serve one connection until the peer hangs up.
///
/// Frames are handled strictly in arrival order and each gets exactly one
/// reply. Undecodable frames are answered with a protocol error and the
/// connection stays up; only I/O and oversized-frame errors end it.
/// Returns the number of requests answered.
pub fn serve_connection(
    stream: BertStream,
    dispatcher: &Dispatcher,
    config: &ServerConfig,
) -> Result<u64> {
    let reader_stream = stream.try_clone()?;
    let mut reader = FrameReader::for_stream(reader_stream, config.frame.clone())?;
    let mut writer = FrameWriter::for_stream(stream, config.frame.clone())?
        .with_encoder(config.encoder.clone());

    let mut served = 0u64;
    loop {
        let decoded = match reader.read_term() {
            Ok(term) => Ok(term),
            Err(FrameError::Codec(err)) => Err(err),
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(err.into()),
        };

        let reply = dispatcher.handle_frame(decoded);
        match writer.write_term(&reply) {
            // Nothing was written; answer with an error so the caller's
            // slot is still filled.
            Err(err @ (FrameError::Codec(_) | FrameError::PayloadTooLarge { .. })) => {
                warn!(error = %err, "reply could not be encoded");
                writer.write_term(&Reply::unencodable(&err).to_term())?;
            }
            other => other?,
        }
        served += 1;
    }

    if let Err(err) = writer.get_ref().shutdown() {
        debug!(error = %err, "shutdown after close failed");
    }
    Ok(served)
}
