use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::Duration;

use crate::error::Result;

/// A connected BERT-RPC byte stream over TCP or a Unix domain socket.
pub struct BertStream {
    socket: Socket,
}

enum Socket {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

/// Run `$body` with `$s` bound to whichever concrete socket is inside.
macro_rules! with_socket {
    ($socket:expr, $s:ident => $body:expr) => {
        match $socket {
            Socket::Tcp($s) => $body,
            #[cfg(unix)]
            Socket::Unix($s) => $body,
        }
    };
}

impl Read for BertStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        with_socket!(&mut self.socket, s => s.read(buf))
    }
}

impl Write for BertStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        with_socket!(&mut self.socket, s => s.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        with_socket!(&mut self.socket, s => s.flush())
    }
}

impl BertStream {
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            socket: Socket::Tcp(stream),
        }
    }

    #[cfg(unix)]
    pub fn from_unix(stream: UnixStream) -> Self {
        Self {
            socket: Socket::Unix(stream),
        }
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        with_socket!(&self.socket, s => s.set_read_timeout(timeout))?;
        Ok(())
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        with_socket!(&self.socket, s => s.set_write_timeout(timeout))?;
        Ok(())
    }

    /// A second handle to the same connection, so one thread can read
    /// while another writes.
    pub fn try_clone(&self) -> Result<Self> {
        let socket = match &self.socket {
            Socket::Tcp(s) => Socket::Tcp(s.try_clone()?),
            #[cfg(unix)]
            Socket::Unix(s) => Socket::Unix(s.try_clone()?),
        };
        Ok(Self { socket })
    }

    /// Shut down both directions. A clone blocked in `read` sees EOF.
    ///
    /// A connection the peer already tore down is not an error.
    pub fn shutdown(&self) -> Result<()> {
        match with_socket!(&self.socket, s => s.shutdown(Shutdown::Both)) {
            Err(err) if err.kind() != io::ErrorKind::NotConnected => Err(err.into()),
            _ => Ok(()),
        }
    }

    /// Remote address (TCP) or peer process (Unix), for logs.
    pub fn peer_label(&self) -> String {
        match &self.socket {
            Socket::Tcp(s) => s
                .peer_addr()
                .map_or_else(|_| "tcp:unknown".to_string(), |addr| addr.to_string()),
            #[cfg(unix)]
            Socket::Unix(_) => self
                .peer_credentials()
                .map_or_else(|| "unix:unknown".to_string(), |(uid, _, pid)| {
                    format!("unix:pid={pid},uid={uid}")
                }),
        }
    }

    /// `(uid, gid, pid)` of a Unix socket peer via `SO_PEERCRED`.
    #[cfg(target_os = "linux")]
    pub fn peer_credentials(&self) -> Option<(u32, u32, u32)> {
        use std::os::fd::AsRawFd;

        let Socket::Unix(s) = &self.socket else {
            return None;
        };
        let mut cred = libc::ucred {
            pid: 0,
            uid: 0,
            gid: 0,
        };
        let expected = std::mem::size_of::<libc::ucred>() as libc::socklen_t;
        let mut len = expected;

        // SAFETY: `s` is an open socket for the duration of the call and
        // `cred`/`len` point to writable storage of the advertised size.
        let rc = unsafe {
            libc::getsockopt(
                s.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_PEERCRED,
                std::ptr::addr_of_mut!(cred).cast::<libc::c_void>(),
                &mut len,
            )
        };
        (rc == 0 && len == expected).then(|| (cred.uid, cred.gid, cred.pid as u32))
    }

    #[cfg(not(target_os = "linux"))]
    pub fn peer_credentials(&self) -> Option<(u32, u32, u32)> {
        None
    }
}

impl fmt::Debug for BertStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.socket {
            Socket::Tcp(_) => "tcp",
            #[cfg(unix)]
            Socket::Unix(_) => "unix",
        };
        f.debug_tuple("BertStream").field(&kind).finish()
    }
}
