use std::net::{SocketAddr, TcpListener, TcpStream};

use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::stream::BertStream;

/// TCP transport.
///
/// Request/reply latency matters more than throughput for RPC traffic, so
/// every accepted or connected stream has Nagle's algorithm disabled.
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Bind and listen on `addr` (`host:port`; port 0 picks a free port).
    pub fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|source| TransportError::Bind {
            endpoint: Endpoint::Tcp(addr.to_string()),
            source,
        })?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "listening on tcp");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<BertStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        stream.set_nodelay(true)?;
        debug!(%peer, "accepted tcp connection");
        Ok(BertStream::from_tcp(stream))
    }

    /// Connect to a listening TCP endpoint (blocking).
    pub fn connect(addr: &str) -> Result<BertStream> {
        let stream = TcpStream::connect(addr).map_err(|source| TransportError::Connect {
            endpoint: Endpoint::Tcp(addr.to_string()),
            source,
        })?;
        stream.set_nodelay(true)?;
        debug!(addr, "connected to tcp endpoint");
        Ok(BertStream::from_tcp(stream))
    }

    /// The address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;

    #[test]
    fn bind_accept_connect() {
        let listener = TcpTransport::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().to_string();

        let handle = std::thread::spawn(move || {
            let mut client = TcpTransport::connect(&addr).unwrap();
            client.write_all(b"bert").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"bert");
        handle.join().unwrap();
    }

    #[test]
    fn connect_refused_maps_to_connect_error() {
        let addr = {
            let spare = TcpTransport::bind("127.0.0.1:0").unwrap();
            spare.local_addr().to_string()
        };
        let result = TcpTransport::connect(&addr);
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
