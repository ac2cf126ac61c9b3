//! Tokio pipelined BERT-RPC client (feature `async`).

use std::sync::{Arc, Mutex};

use bertrpc_frame::{BerpCodec, DEFAULT_MAX_PAYLOAD};
use bertrpc_term::{Encoder, Term};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, warn};

use crate::client::lock;
use crate::correlator::{reply_result, Correlator};
use crate::envelope::Request;
use crate::error::{Result, RpcError};

type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

/// Async counterpart of [`Client`](crate::Client).
///
/// Calls may be issued concurrently from many tasks; requests are written
/// under a lock so the reply queue always mirrors wire order.
pub struct AsyncClient {
    writer: tokio::sync::Mutex<FramedWrite<BoxedWrite, BerpCodec>>,
    correlator: Arc<Mutex<Correlator>>,
    reader: JoinHandle<()>,
}

impl AsyncClient {
    /// Connect over TCP.
    pub async fn connect_tcp(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(bertrpc_transport::TransportError::Io)?;
        Ok(Self::from_stream(stream))
    }

    /// Run the client over any async byte stream.
    pub fn from_stream<S>(io: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Self::with_codec(io, DEFAULT_MAX_PAYLOAD, Encoder::default())
    }

    /// Run the client with explicit frame limit and request encoder.
    pub fn with_codec<S>(io: S, max_payload: usize, encoder: Encoder) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (read, write) = tokio::io::split(io);
        let frames = FramedRead::new(read, BerpCodec::with_max_payload(max_payload));
        let writer = FramedWrite::new(
            Box::new(write) as BoxedWrite,
            BerpCodec::with_max_payload(max_payload).with_encoder(encoder),
        );

        let correlator = Arc::new(Mutex::new(Correlator::new()));
        let reader = tokio::spawn(read_replies(frames, Arc::clone(&correlator)));

        Self {
            writer: tokio::sync::Mutex::new(writer),
            correlator,
            reader,
        }
    }

    /// Send a request and return a receiver for its outcome.
    ///
    /// The reply handler is queued only once the frame sits in the write
    /// buffer, with no await in between. Dropping this future while it
    /// waits for buffer space therefore leaves neither a frame nor a
    /// handler behind, and later replies stay matched to their requests.
    pub async fn send(&self, request: &Request) -> Result<oneshot::Receiver<Result<Term>>> {
        let mut writer = self.writer.lock().await;
        if lock(&self.correlator).is_closed() {
            return Err(RpcError::TransportClosed);
        }
        writer.feed(request.to_term()).await?;

        let (tx, rx) = oneshot::channel();
        lock(&self.correlator).push(Box::new(move |result| {
            let _ = tx.send(result);
        }))?;
        // Cancelled here, the frame still goes out with the next flush and
        // its handler is already queued.
        if let Err(err) = SinkExt::<Term>::flush(&mut *writer).await {
            drop(lock(&self.correlator).pop_back());
            return Err(err.into());
        }
        debug!(request = %request, "request sent");
        Ok(rx)
    }

    /// Call `module:function(args)` and await the result.
    pub async fn call(&self, module: &str, function: &str, args: Vec<Term>) -> Result<Term> {
        let rx = self.send(&Request::call(module, function, args)).await?;
        rx.await.unwrap_or(Err(RpcError::TransportClosed))
    }

    /// Cast `module:function(args)`; waits only for the `{noreply}`
    /// acknowledgement.
    pub async fn cast(&self, module: &str, function: &str, args: Vec<Term>) -> Result<()> {
        let rx = self.send(&Request::cast(module, function, args)).await?;
        rx.await.unwrap_or(Err(RpcError::TransportClosed)).map(drop)
    }

    pub fn pending(&self) -> usize {
        lock(&self.correlator).pending()
    }

    /// Shut down the write side and fail anything still pending.
    pub async fn close(&self) {
        if let Err(err) = self.writer.lock().await.get_mut().shutdown().await {
            debug!(error = %err, "client shutdown failed");
        }
        self.reader.abort();
        lock(&self.correlator).close();
    }
}

impl Drop for AsyncClient {
    fn drop(&mut self) {
        self.reader.abort();
        lock(&self.correlator).close();
    }
}

async fn read_replies<R>(
    mut frames: FramedRead<ReadHalf<R>, BerpCodec>,
    correlator: Arc<Mutex<Correlator>>,
) where
    R: AsyncRead,
{
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(decoded) => {
                let handler = lock(&correlator).take_head();
                match handler {
                    Some(handler) => handler(reply_result(decoded)),
                    None => warn!("reply received with no pending request; dropped"),
                }
            }
            Err(err) => {
                warn!(error = %err, "reply stream unrecoverable");
                break;
            }
        }
    }
    let failed = lock(&correlator).close();
    debug!(failed, "client reader finished");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bertrpc_term::Term;
    use tokio::net::TcpListener;

    use super::*;
    use crate::async_server::AsyncServer;
    use crate::envelope::ErrorType;
    use crate::registry::{Module, ModuleRegistry};

    fn server() -> AsyncServer {
        AsyncServer::new(ModuleRegistry::new().with_module(
            "math",
            Module::new().function("add", |args| {
                Ok(Term::Integer(args.iter().filter_map(Term::as_i64).sum()))
            }),
        ))
    }

    #[tokio::test]
    async fn call_and_cast_over_duplex() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        tokio::spawn(async move { server().serve_connection(server_io).await });
        let client = AsyncClient::from_stream(client_io);

        assert_eq!(
            client.call("math", "add", vec![1.into(), 2.into()]).await.unwrap(),
            Term::Integer(3)
        );
        client.cast("math", "add", vec![]).await.unwrap();
        let err = client.call("nope", "add", vec![]).await.unwrap_err();
        assert!(matches!(err, RpcError::Remote(e) if e.kind == ErrorType::Server));
        assert_eq!(client.pending(), 0);
    }

    #[tokio::test]
    async fn pipelined_sends_resolve_in_order() {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move { server().serve_connection(server_io).await });
        let client = AsyncClient::from_stream(client_io);

        let mut receivers = Vec::new();
        for n in 0..16 {
            let request = Request::call("math", "add", vec![Term::Integer(n)]);
            receivers.push(client.send(&request).await.unwrap());
        }
        for (n, rx) in receivers.into_iter().enumerate() {
            assert_eq!(rx.await.unwrap().unwrap(), Term::Integer(n as i64));
        }
    }

    #[tokio::test]
    async fn peer_hangup_fails_pending() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let client = AsyncClient::from_stream(client_io);

        let rx = client.send(&Request::call("m", "f", vec![])).await.unwrap();
        drop(server_io);
        assert!(matches!(rx.await.unwrap(), Err(RpcError::TransportClosed)));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(matches!(
            client.call("m", "f", vec![]).await,
            Err(RpcError::TransportClosed) | Err(RpcError::Frame(_))
        ));
    }

    #[tokio::test]
    async fn connects_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { server().serve(listener).await });

        let client = AsyncClient::connect_tcp(addr).await.unwrap();
        assert_eq!(
            client.call("math", "add", vec![20.into(), 22.into()]).await.unwrap(),
            Term::Integer(42)
        );
        client.close().await;
        assert!(matches!(
            client.call("math", "add", vec![]).await,
            Err(RpcError::TransportClosed)
        ));
    }

    #[tokio::test]
    async fn cancelled_send_under_backpressure_keeps_replies_aligned() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        let client = AsyncClient::from_stream(client_io);
        let wait = Duration::from_millis(20);

        // Nobody reads yet: the first frame is buffered but cannot flush,
        // and the second cannot even get buffer space.
        let big = Term::binary(vec![0u8; 16 * 1024]);
        let first = tokio::time::timeout(wait, client.call("math", "add", vec![big])).await;
        assert!(first.is_err());
        assert_eq!(client.pending(), 1);
        let second = tokio::time::timeout(wait, client.call("math", "add", vec![5.into()])).await;
        assert!(second.is_err());
        assert_eq!(client.pending(), 1);

        tokio::spawn(async move { server().serve_connection(server_io).await });
        let third = tokio::time::timeout(
            Duration::from_secs(5),
            client.call("math", "add", vec![7.into()]),
        )
        .await
        .expect("third call should be answered");
        assert_eq!(third.unwrap(), Term::Integer(7));
        assert_eq!(client.pending(), 0);
    }
}
