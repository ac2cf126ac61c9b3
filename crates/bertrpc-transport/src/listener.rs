use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::stream::BertStream;
use crate::tcp::TcpTransport;
#[cfg(unix)]
use crate::uds::UnixDomainSocket;

/// A bound listener for any supported [`Endpoint`].
pub enum BertListener {
    Tcp(TcpTransport),
    #[cfg(unix)]
    Unix(UnixDomainSocket),
}

impl BertListener {
    /// Bind to the given endpoint.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        match endpoint {
            Endpoint::Tcp(addr) => Ok(Self::Tcp(TcpTransport::bind(addr)?)),
            #[cfg(unix)]
            Endpoint::Unix(path) => Ok(Self::Unix(UnixDomainSocket::bind(path)?)),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(crate::error::TransportError::Unsupported(endpoint.clone())),
        }
    }

    /// Accept the next connection (blocking).
    pub fn accept(&self) -> Result<BertStream> {
        match self {
            Self::Tcp(listener) => listener.accept(),
            #[cfg(unix)]
            Self::Unix(listener) => listener.accept(),
        }
    }

    /// The endpoint actually bound (TCP port 0 is resolved).
    pub fn local_endpoint(&self) -> Endpoint {
        match self {
            Self::Tcp(listener) => Endpoint::Tcp(listener.local_addr().to_string()),
            #[cfg(unix)]
            Self::Unix(listener) => Endpoint::Unix(listener.path().to_path_buf()),
        }
    }
}

/// Connect to a listening endpoint (blocking).
pub fn connect(endpoint: &Endpoint) -> Result<BertStream> {
    debug!(%endpoint, "connecting");
    match endpoint {
        Endpoint::Tcp(addr) => TcpTransport::connect(addr),
        #[cfg(unix)]
        Endpoint::Unix(path) => UnixDomainSocket::connect(path),
        #[cfg(not(unix))]
        Endpoint::Unix(_) => Err(crate::error::TransportError::Unsupported(endpoint.clone())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;
    use crate::error::TransportError;

    #[test]
    fn tcp_listener_resolves_ephemeral_port() {
        let listener = BertListener::bind(&"127.0.0.1:0".parse().unwrap()).unwrap();
        let endpoint = listener.local_endpoint();
        assert!(matches!(&endpoint, Endpoint::Tcp(addr) if !addr.ends_with(":0")));

        let handle = std::thread::spawn(move || {
            let mut client = connect(&endpoint).unwrap();
            client.write_all(&[131, 106]).unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 2];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [131, 106]);
        handle.join().unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn unix_listener_reports_path() {
        let dir = std::env::temp_dir().join(format!("bertrpc-listener-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let endpoint = Endpoint::Unix(dir.join("l.sock"));

        let listener = BertListener::bind(&endpoint).unwrap();
        assert_eq!(listener.local_endpoint(), endpoint);

        drop(listener);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn connect_error_carries_endpoint() {
        let endpoint: Endpoint = "127.0.0.1:1".parse().unwrap();
        match connect(&endpoint) {
            Err(TransportError::Connect { endpoint: e, .. }) => assert_eq!(e, endpoint),
            other => panic!("expected connect error, got {other:?}"),
        }
    }
}
