use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

/// Where a BERT-RPC service listens or a client connects.
///
/// Accepted textual forms:
/// - `unix:/run/svc.sock` or any absolute path: Unix domain socket
/// - `tcp:host:port` or `host:port`: TCP
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp(String),
}

impl Endpoint {
    /// Short transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Endpoint::Unix(_) => "unix-domain-socket",
            Endpoint::Tcp(_) => "tcp",
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if let Some(path) = input.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(TransportError::InvalidEndpoint(input.to_string()));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if input.starts_with('/') || input.starts_with("./") {
            return Ok(Endpoint::Unix(PathBuf::from(input)));
        }

        let addr = input.strip_prefix("tcp:").unwrap_or(input);
        match addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(Endpoint::Tcp(addr.to_string()))
            }
            _ => Err(TransportError::InvalidEndpoint(input.to_string())),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp:{addr}"),
        }
    }
}
