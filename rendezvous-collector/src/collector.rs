//! The collector loop.
//!
//! Collectors read model responses from the response topic and deliver the
//! ones produced by the active model version to the caller's socket.
//! Responses from any other version (shadow or canary deployments) are
//! dropped without error.

use std::path::PathBuf;
use std::sync::Arc;

use rendezvous_common::{catch_panic, socket_address, Consumer, RendezvousMessage, SocketWriter};

use crate::config::CollectorConfig;
use crate::error::{Error, Result};

/// What happened to a successfully decoded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Response data was written to the caller's socket.
    Delivered { id: String, address: PathBuf },
    /// Response came from a model version other than the active one.
    Skipped { id: String, model_version: String },
}

pub struct Collector {
    consumer: Box<dyn Consumer>,
    writer: Arc<dyn SocketWriter>,
    config: CollectorConfig,
}

impl Collector {
    pub fn new(
        consumer: Box<dyn Consumer>,
        writer: Arc<dyn SocketWriter>,
        config: CollectorConfig,
    ) -> Self {
        Self {
            consumer,
            writer,
            config,
        }
    }

    /// Process messages until the transport closes.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(
            "Collector running for active model version {}",
            self.config.active_model_version
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

    /// Receive a single response and deliver it if it is for the active model.
    pub async fn handle_next_message(&mut self) -> Result<Outcome> {
        match catch_panic(self.process_next_message()).await {
            Ok(result) => result,
            Err(panic) => Err(Error::Panic(panic)),
        }
    }

    async fn process_next_message(&mut self) -> Result<Outcome> {
        let payload = self.consumer.receive().await.map_err(Error::Receive)?;
        let message = RendezvousMessage::decode(&payload)?;

        if message.response_model_version() != self.config.active_model_version {
            tracing::debug!(
                message_id = %message.id(),
                model_version = %message.response_model_version(),
                "Skipping response from inactive model version"
            );
            return Ok(Outcome::Skipped {
                id: message.id().to_string(),
                model_version: message.response_model_version().to_string(),
            });
        }

        let address = socket_address(&self.config.socket_dir, message.id())?;
        self.writer
            .write(&address, message.response_payload().as_bytes())
            .await?;

        tracing::debug!(
            message_id = %message.id(),
            address = %address.display(),
            "Delivered response"
        );
        Ok(Outcome::Delivered {
            id: message.id().to_string(),
            address,
        })
    }
}
