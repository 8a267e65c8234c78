//! Unix domain socket delivery.

use std::path::Path;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

use super::{SocketError, SocketWriter};

/// Connects to the caller's socket, writes the response and closes the
/// write half so the caller sees end-of-stream.
#[derive(Debug, Clone, Default)]
pub struct UnixSocketWriter;

impl UnixSocketWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SocketWriter for UnixSocketWriter {
    async fn write(&self, address: &Path, data: &[u8]) -> Result<(), SocketError> {
        let mut stream = UnixStream::connect(address)
            .await
            .map_err(|source| SocketError::Connect {
                path: address.to_path_buf(),
                source,
            })?;

        let write_error = |source: std::io::Error| SocketError::Write {
            path: address.to_path_buf(),
            source,
        };
        stream.write_all(data).await.map_err(write_error)?;
        stream.shutdown().await.map_err(write_error)?;

        Ok(())
    }
}
