//! In-process topics.
//!
//! A `MemoryTopic` behaves like a single shared subscription: every consumer
//! created from the same topic competes for messages, and each message is
//! received by exactly one of them.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use super::{Consumer, MessagingError, Producer, Result};

/// An in-memory topic with one shared subscription.
#[derive(Clone)]
pub struct MemoryTopic {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl MemoryTopic {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn producer(&self) -> MemoryProducer {
        MemoryProducer {
            tx: self.tx.clone(),
        }
    }

    pub fn consumer(&self) -> MemoryConsumer {
        MemoryConsumer {
            rx: self.rx.clone(),
        }
    }

    /// Enqueue a payload without going through a producer.
    pub fn publish(&self, payload: impl Into<Vec<u8>>) -> Result<()> {
        self.tx
            .send(payload.into())
            .map_err(|_| MessagingError::Closed)
    }

    /// Take the next payload if one is already queued.
    pub async fn try_take(&self) -> Option<Vec<u8>> {
        self.rx.lock().await.try_recv().ok()
    }

    /// Close the topic.
    ///
    /// Further sends fail; consumers drain what is queued and then receive
    /// `MessagingError::Closed`.
    pub async fn close(&self) {
        self.rx.lock().await.close();
    }
}

impl Default for MemoryTopic {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MemoryProducer {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

#[async_trait]
impl Producer for MemoryProducer {
    async fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.tx
            .send(payload.to_vec())
            .map_err(|_| MessagingError::Closed)
    }
}

pub struct MemoryConsumer {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

#[async_trait]
impl Consumer for MemoryConsumer {
    async fn receive(&mut self) -> Result<Vec<u8>> {
        self.rx.lock().await.recv().await.ok_or(MessagingError::Closed)
    }
}
