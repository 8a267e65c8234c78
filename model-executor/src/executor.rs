//! The executor loop.
//!
//! Each iteration takes one request envelope off the request topic, calls the
//! model backend with its payload, stamps the envelope with the response, this
//! executor's model version and timing, and publishes it to the response topic.
//! Failures are logged and the message is dropped; nothing is retried.

use std::sync::Arc;

use chrono::Utc;
use rendezvous_common::{catch_panic, Consumer, Producer, RendezvousMessage};

use crate::backend::ModelBackend;
use crate::config::ExecutorConfig;
use crate::error::{Error, Result};

pub struct Executor {
    consumer: Box<dyn Consumer>,
    producer: Box<dyn Producer>,
    backend: Arc<dyn ModelBackend>,
    config: ExecutorConfig,
}

impl Executor {
    /// Create an executor answering with `config.model_version`.
    ///
    /// Every published response carries that version, so it must not be blank.
    pub fn new(
        consumer: Box<dyn Consumer>,
        producer: Box<dyn Producer>,
        backend: Arc<dyn ModelBackend>,
        config: ExecutorConfig,
    ) -> Result<Self> {
        if config.model_version.trim().is_empty() {
            return Err(Error::Config("model_version must not be empty".to_string()));
        }

        Ok(Self {
            consumer,
            producer,
            backend,
            config,
        })
    }

    /// Process messages until the transport closes.
    ///
    /// Per-message failures are logged and skipped. The only way out is a
    /// closed transport, which is returned to the caller.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(
            "Executor running for model version {}",
            self.config.model_version
        );

        loop {
            if let Err(e) = self.handle_next_message().await {
                tracing::error!("{}", e);
                if e.is_fatal() {
                    return Err(e);
                }
            }
        }
    }

    /// Receive, execute and publish a single message.
    pub async fn handle_next_message(&mut self) -> Result<()> {
        match catch_panic(self.process_next_message()).await {
            Ok(result) => result,
            Err(panic) => Err(Error::Panic(panic)),
        }
    }

    async fn process_next_message(&mut self) -> Result<()> {
        let payload = self.consumer.receive().await.map_err(Error::Receive)?;

        let mut message = RendezvousMessage::decode(&payload)?;
        self.set_model_response(&mut message).await?;

        let payload = message.encode()?;
        self.producer.send(&payload).await.map_err(Error::Publish)?;

        tracing::debug!(
            message_id = %message.id(),
            duration_ms = ?message.request_duration().map(|d| d.num_milliseconds()),
            "published message: {}",
            String::from_utf8_lossy(&payload)
        );
        Ok(())
    }

    async fn set_model_response(&self, message: &mut RendezvousMessage) -> Result<()> {
        message.set_request_started(Utc::now());
        let body = self
            .backend
            .invoke(message.request_payload().as_bytes())
            .await?;
        message.set_request_finished(Utc::now());

        message.set_model_response(self.config.model_version.clone(), &body);
        Ok(())
    }
}
