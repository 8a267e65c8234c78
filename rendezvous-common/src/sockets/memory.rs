//! In-memory delivery that records every write.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{SocketError, SocketWriter};

/// Records writes instead of touching sockets. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MemorySocketWriter {
    writes: Arc<Mutex<Vec<(PathBuf, Vec<u8>)>>>,
    failure: Option<String>,
}

impl MemorySocketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer whose every write fails with the given reason.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            writes: Arc::default(),
            failure: Some(reason.into()),
        }
    }

    /// All successful writes so far, in order.
    pub fn writes(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Writes made to a single address.
    pub fn writes_to(&self, address: &Path) -> Vec<Vec<u8>> {
        self.writes()
            .into_iter()
            .filter(|(path, _)| path == address)
            .map(|(_, data)| data)
            .collect()
    }
}

#[async_trait]
impl SocketWriter for MemorySocketWriter {
    async fn write(&self, address: &Path, data: &[u8]) -> Result<(), SocketError> {
        if let Some(ref reason) = self.failure {
            return Err(SocketError::Rejected(reason.clone()));
        }
        self.writes
            .lock()
            .map_err(|e| SocketError::Rejected(e.to_string()))?
            .push((address.to_path_buf(), data.to_vec()));
        Ok(())
    }
}
