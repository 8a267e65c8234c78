//! Apache Pulsar transport over the broker's WebSocket API.
//!
//! Each consumer and producer owns its own WebSocket connection:
//!
//! - consumer: `{url}/ws/v2/consumer/persistent/{tenant}/{namespace}/{topic}/{subscription}?subscriptionType=Shared`
//! - producer: `{url}/ws/v2/producer/persistent/{tenant}/{namespace}/{topic}`
//!
//! Payloads are base64-encoded inside JSON frames. Consumers acknowledge each
//! message as soon as it is received, so delivery is at-most-once.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{Consumer, MessagingConfig, MessagingError, Producer, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WebSocket frame types
// ============================================================================

/// Message pushed by the broker to a consumer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsumerFrame {
    message_id: String,
    payload: String,
    #[serde(default)]
    redelivery_count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AckFrame<'a> {
    message_id: &'a str,
}

#[derive(Debug, Serialize)]
struct ProducerFrame<'a> {
    payload: String,
    context: &'a str,
}

/// Broker reply to a produced message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProducerAck {
    result: String,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    error_msg: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Factory for Pulsar consumers and producers.
pub struct PulsarClient {
    config: MessagingConfig,
}

impl PulsarClient {
    pub fn new(config: MessagingConfig) -> Self {
        Self { config }
    }

    pub fn consumer_url(&self, topic: &str, subscription: &str) -> String {
        format!(
            "{}/ws/v2/consumer/persistent/{}/{}/{}/{}?subscriptionType=Shared",
            self.base_url(),
            self.config.tenant,
            self.config.namespace,
            topic,
            subscription
        )
    }

    pub fn producer_url(&self, topic: &str) -> String {
        format!(
            "{}/ws/v2/producer/persistent/{}/{}/{}",
            self.base_url(),
            self.config.tenant,
            self.config.namespace,
            topic
        )
    }

    /// Subscribe to a topic with a shared subscription.
    pub async fn create_consumer(&self, topic: &str, subscription: &str) -> Result<PulsarConsumer> {
        let url = self.consumer_url(topic, subscription);
        let stream = self.connect(&url).await?;
        tracing::info!("Subscribed to {} as {}", topic, subscription);
        Ok(PulsarConsumer { stream })
    }

    /// Open a producer for a topic.
    pub async fn create_producer(&self, topic: &str) -> Result<PulsarProducer> {
        let url = self.producer_url(topic);
        let stream = self.connect(&url).await?;
        tracing::info!("Producing to {}", topic);
        Ok(PulsarProducer {
            stream,
            sequence: 0,
        })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    async fn connect(&self, url: &str) -> Result<WsStream> {
        let mut request = url
            .into_client_request()
            .map_err(|e| MessagingError::Connect(format!("{}: {}", url, e)))?;

        if let Some(ref token) = self.config.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| MessagingError::Connect(format!("invalid auth token: {}", e)))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (stream, _) = connect_async(request)
            .await
            .map_err(|e| MessagingError::Connect(format!("{}: {}", url, e)))?;
        Ok(stream)
    }
}

fn map_ws_error(error: WsError, wrap: fn(String) -> MessagingError) -> MessagingError {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => MessagingError::Closed,
        other => wrap(other.to_string()),
    }
}

// ============================================================================
// Consumer
// ============================================================================

pub struct PulsarConsumer {
    stream: WsStream,
}

impl PulsarConsumer {
    async fn acknowledge(&mut self, message_id: &str) -> Result<()> {
        let ack = serde_json::to_string(&AckFrame { message_id })
            .map_err(|e| MessagingError::Receive(e.to_string()))?;
        self.stream
            .send(Message::Text(ack))
            .await
            .map_err(|e| map_ws_error(e, MessagingError::Receive))
    }
}

#[async_trait]
impl Consumer for PulsarConsumer {
    async fn receive(&mut self) -> Result<Vec<u8>> {
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(map_ws_error(e, MessagingError::Receive)),
                None => return Err(MessagingError::Closed),
            };

            match message {
                Message::Text(text) => {
                    let frame: ConsumerFrame = serde_json::from_str(&text)
                        .map_err(|e| MessagingError::InvalidFrame(e.to_string()))?;
                    if frame.redelivery_count > 0 {
                        tracing::debug!(
                            "Message {} redelivered {} times",
                            frame.message_id,
                            frame.redelivery_count
                        );
                    }

                    self.acknowledge(&frame.message_id).await?;

                    return BASE64
                        .decode(frame.payload)
                        .map_err(|e| MessagingError::InvalidFrame(e.to_string()));
                }
                Message::Ping(data) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| map_ws_error(e, MessagingError::Receive))?;
                }
                Message::Close(_) => return Err(MessagingError::Closed),
                _ => {} // Ignore other frame types
            }
        }
    }
}

// ============================================================================
// Producer
// ============================================================================

pub struct PulsarProducer {
    stream: WsStream,
    sequence: u64,
}

#[async_trait]
impl Producer for PulsarProducer {
    async fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.sequence += 1;
        let context = self.sequence.to_string();

        let frame = serde_json::to_string(&ProducerFrame {
            payload: BASE64.encode(payload),
            context: &context,
        })
        .map_err(|e| MessagingError::Send(e.to_string()))?;

        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(|e| map_ws_error(e, MessagingError::Send))?;

        // Wait for the broker to accept or reject this message
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(map_ws_error(e, MessagingError::Send)),
                None => return Err(MessagingError::Closed),
            };

            match message {
                Message::Text(text) => {
                    let ack: ProducerAck = serde_json::from_str(&text)
                        .map_err(|e| MessagingError::InvalidFrame(e.to_string()))?;

                    if ack.context.as_deref().is_some_and(|c| c != context) {
                        tracing::debug!("Ignoring reply for stale context {:?}", ack.context);
                        continue;
                    }

                    if ack.result == "ok" {
                        tracing::trace!("Broker accepted message {:?}", ack.message_id);
                        return Ok(());
                    }
                    return Err(MessagingError::Send(ack.error_msg.unwrap_or(ack.result)));
                }
                Message::Ping(data) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| map_ws_error(e, MessagingError::Send))?;
                }
                Message::Close(_) => return Err(MessagingError::Closed),
                _ => {}
            }
        }
    }
}
