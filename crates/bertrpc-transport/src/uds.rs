use std::io::ErrorKind;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::stream::BertStream;

#[cfg(target_os = "linux")]
const SUN_PATH_MAX: usize = 108;
#[cfg(not(target_os = "linux"))]
const SUN_PATH_MAX: usize = 104;

/// Unix domain socket listener.
///
/// Binding replaces a stale socket file left by a dead server but refuses
/// to take over a path another server is still accepting on. The socket
/// file is unlinked on drop unless something else has replaced it.
pub struct UnixDomainSocket {
    listener: UnixListener,
    file: SocketFile,
}

/// Identity of the socket file this process created.
struct SocketFile {
    path: PathBuf,
    dev: u64,
    ino: u64,
}

impl SocketFile {
    fn still_ours(&self) -> bool {
        std::fs::symlink_metadata(&self.path).is_ok_and(|meta| {
            meta.file_type().is_socket() && meta.dev() == self.dev && meta.ino() == self.ino
        })
    }
}

impl Drop for SocketFile {
    fn drop(&mut self) {
        if self.still_ours() {
            debug!(path = ?self.path, "removing socket file");
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl UnixDomainSocket {
    /// Mode applied to created socket files: owner read/write only.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_SOCKET_MODE)
    }

    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref();
        let len = path.as_os_str().len();
        if len >= SUN_PATH_MAX {
            return Err(TransportError::PathTooLong {
                path: path.to_path_buf(),
                len,
                max: SUN_PATH_MAX,
            });
        }

        let bind_err = |source: std::io::Error| TransportError::Bind {
            endpoint: Endpoint::Unix(path.to_path_buf()),
            source,
        };

        clear_stale(path).map_err(bind_err)?;
        let listener = UnixListener::bind(path).map_err(bind_err)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(bind_err)?;
        let meta = std::fs::symlink_metadata(path).map_err(bind_err)?;

        info!(?path, "listening on unix domain socket");
        Ok(Self {
            listener,
            file: SocketFile {
                path: path.to_path_buf(),
                dev: meta.dev(),
                ino: meta.ino(),
            },
        })
    }

    pub fn accept(&self) -> Result<BertStream> {
        let (stream, _) = self.listener.accept().map_err(TransportError::Accept)?;
        Ok(BertStream::from_unix(stream))
    }

    pub fn connect(path: impl AsRef<Path>) -> Result<BertStream> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|source| TransportError::Connect {
            endpoint: Endpoint::Unix(path.to_path_buf()),
            source,
        })?;
        debug!(?path, "connected to unix domain socket");
        Ok(BertStream::from_unix(stream))
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }
}

/// Remove a leftover socket file at `path`. Regular files are never
/// touched, and a socket with a live listener is reported as in use.
fn clear_stale(path: &Path) -> std::io::Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    if !meta.file_type().is_socket() {
        return Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "existing path is not a unix socket",
        ));
    }
    if UnixStream::connect(path).is_ok() {
        return Err(std::io::Error::new(
            ErrorKind::AddrInUse,
            "another server is listening on this socket",
        ));
    }
    debug!(?path, "removing stale socket");
    std::fs::remove_file(path)
}
