//! Transport port for the rendezvous bus.
//!
//! Envelopes travel on two streams: the request stream (`model-input`) read by
//! model executors, and the response stream (`model-response`) read by
//! collectors. A `Consumer` is bound to one topic and subscription; a
//! `Producer` is bound to one topic.
//!
//! Two implementations are provided:
//! - [`pulsar`]: Apache Pulsar over its WebSocket API
//! - [`memory`]: in-process topics, used for tests and local wiring

pub mod memory;
pub mod pulsar;

pub use memory::{MemoryConsumer, MemoryProducer, MemoryTopic};
pub use pulsar::{PulsarClient, PulsarConsumer, PulsarProducer};

use async_trait::async_trait;
use serde::Deserialize;

/// Topic carrying caller requests to model executors.
pub const REQUEST_TOPIC: &str = "model-input";
/// Topic carrying model responses to collectors.
pub const RESPONSE_TOPIC: &str = "model-response";

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, MessagingError>;

/// Receiving half of a topic binding.
#[async_trait]
pub trait Consumer: Send {
    /// Wait for the next message on the subscription and return its payload.
    async fn receive(&mut self) -> Result<Vec<u8>>;
}

/// Sending half of a topic binding.
#[async_trait]
pub trait Producer: Send {
    /// Publish a payload, returning once the transport accepts or rejects it.
    async fn send(&mut self, payload: &[u8]) -> Result<()>;
}

/// Connection settings for the message bus.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Pulsar WebSocket service URL.
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_tenant")]
    pub tenant: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Optional prefix applied to topic and subscription names, so several
    /// deployments can share one namespace.
    #[serde(default)]
    pub topic_prefix: Option<String>,
    /// Bearer token sent on connect.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            tenant: default_tenant(),
            namespace: default_namespace(),
            topic_prefix: None,
            auth_token: None,
        }
    }
}

impl MessagingConfig {
    /// Full topic name for a logical stream (e.g. `model-input`).
    pub fn topic_name(&self, name: &str) -> String {
        self.prefixed(name)
    }

    /// Subscription name for a logical subscription.
    pub fn subscription_name(&self, name: &str) -> String {
        self.prefixed(name)
    }

    fn prefixed(&self, name: &str) -> String {
        match self.topic_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{}-{}", prefix, name),
            _ => name.to_string(),
        }
    }
}

// Default values
fn default_url() -> String {
    "ws://localhost:8080".to_string()
}
fn default_tenant() -> String {
    "public".to_string()
}
fn default_namespace() -> String {
    "default".to_string()
}
