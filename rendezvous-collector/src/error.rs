//! Error types for the rendezvous collector.

use rendezvous_common::{DecodeError, MessagingError, SocketError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read rendezvous message from consumer: {0}")]
    Receive(MessagingError),

    #[error("failed to parse rendezvous message: {0}")]
    Decode(#[from] DecodeError),

    #[error("failed to write rendezvous message response data to socket: {0}")]
    Delivery(#[from] SocketError),

    #[error("panic occurred: {0}")]
    Panic(String),
}

impl Error {
    /// True when the response topic is gone and the loop cannot make progress.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Receive(MessagingError::Closed))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
