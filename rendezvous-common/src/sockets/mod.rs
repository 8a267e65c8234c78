//! Delivery port: hands response bytes to the caller waiting on a request.
//!
//! Every caller listens on a private Unix socket whose path is derived from
//! the envelope id. Callers and collectors must agree on the scheme, which is
//! fixed as `{socket_dir}/{id}.sock` (e.g. `/sockets/m1.sock`). An id must be
//! a single file name, so the address can never leave `socket_dir`.

pub mod memory;
#[cfg(unix)]
mod unix;

pub use memory::MemorySocketWriter;
#[cfg(unix)]
pub use unix::UnixSocketWriter;

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

/// Directory that holds per-request sockets unless configured otherwise.
pub const DEFAULT_SOCKET_DIR: &str = "/sockets";

/// Delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("message id {0:?} is not a valid socket name")]
    InvalidId(String),

    #[error("{0}")]
    Rejected(String),
}

/// True when `id` is a single plain file name component.
pub fn is_valid_socket_id(id: &str) -> bool {
    let mut components = Path::new(id).components();
    matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
        && !id.contains(['/', '\0'])
}

/// Address of the delivery socket for a message id.
pub fn socket_address(socket_dir: impl AsRef<Path>, id: &str) -> Result<PathBuf, SocketError> {
    if !is_valid_socket_id(id) {
        return Err(SocketError::InvalidId(id.to_string()));
    }
    Ok(socket_dir.as_ref().join(format!("{}.sock", id)))
}

/// Writes response data to a caller's delivery socket.
#[async_trait]
pub trait SocketWriter: Send + Sync {
    async fn write(&self, address: &Path, data: &[u8]) -> Result<(), SocketError>;
}
