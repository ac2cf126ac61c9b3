//! Tokio BERT-RPC server (feature `async`).

use std::sync::Arc;

use bertrpc_frame::{BerpCodec, FrameError, DEFAULT_MAX_PAYLOAD};
use bertrpc_term::Encoder;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::envelope::Reply;
use crate::error::Result;
use crate::registry::ModuleRegistry;

/// Serves one task per connection. Requests on a connection are still
/// handled one at a time, in order.
#[derive(Debug, Clone)]
pub struct AsyncServer {
    dispatcher: Dispatcher,
    max_payload: usize,
    encoder: Encoder,
}

impl AsyncServer {
    pub fn new(registry: impl Into<Arc<ModuleRegistry>>) -> Self {
        Self {
            dispatcher: Dispatcher::new(registry),
            max_payload: DEFAULT_MAX_PAYLOAD,
            encoder: Encoder::default(),
        }
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    pub fn with_encoder(mut self, encoder: Encoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Accept connections forever, spawning a task for each.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener
                .accept()
                .await
                .map_err(bertrpc_transport::TransportError::Io)?;
            info!(peer = %peer, "connection accepted");

            let server = self.clone();
            tokio::spawn(async move {
                match server.serve_connection(stream).await {
                    Ok(served) => info!(peer = %peer, served, "connection closed"),
                    Err(err) => warn!(peer = %peer, error = %err, "connection failed"),
                }
            });
        }
    }

    /// Serve one connection until the peer hangs up. Returns the number of
    /// requests answered.
    pub async fn serve_connection<S>(&self, io: S) -> Result<u64>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let codec = BerpCodec::with_max_payload(self.max_payload).with_encoder(self.encoder.clone());
        let mut framed = Framed::new(io, codec);

        let mut served = 0u64;
        while let Some(frame) = framed.next().await {
            let decoded = match frame {
                Ok(decoded) => decoded,
                Err(FrameError::ConnectionClosed) => break,
                Err(err) => return Err(err.into()),
            };
            let reply = self.dispatcher.handle_frame(decoded);
            match framed.send(reply).await {
                // The codec left its buffer untouched; answer with an error
                // so the caller's slot is still filled.
                Err(err @ (FrameError::Codec(_) | FrameError::PayloadTooLarge { .. })) => {
                    warn!(error = %err, "reply could not be encoded");
                    framed.send(Reply::unencodable(&err).to_term()).await?;
                }
                other => other?,
            }
            served += 1;
        }
        debug!(served, "peer hung up");
        Ok(served)
    }
}
