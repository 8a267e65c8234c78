//! Error types for the model executor.

use rendezvous_common::{DecodeError, MessagingError};

use crate::backend::BackendError;

/// Executor errors.
///
/// Apart from `Config`, each variant names the per-message step that failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid executor configuration: {0}")]
    Config(String),

    #[error("failed to read rendezvous message from consumer: {0}")]
    Receive(MessagingError),

    #[error("failed to parse rendezvous message: {0}")]
    Decode(#[from] DecodeError),

    #[error("failed to get model response: {0}")]
    BackendCall(#[from] BackendError),

    #[error("failed to encode model response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to send rendezvous message with model response: {0}")]
    Publish(MessagingError),

    #[error("panic occurred: {0}")]
    Panic(String),
}

impl Error {
    /// True when the transport is gone and the loop cannot make progress.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Receive(MessagingError::Closed) | Error::Publish(MessagingError::Closed)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
