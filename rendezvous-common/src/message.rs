//! The rendezvous message envelope.
//!
//! A `RendezvousMessage` is created by the caller that originates an inference
//! request, enriched exactly once by a model executor, and read by collectors
//! that decide whether to deliver the response back to the caller.
//!
//! # Wire format
//!
//! Envelopes are JSON objects with camelCase keys:
//!
//! ```json
//! {
//!   "id": "m1",
//!   "requestPayload": "q",
//!   "responseModelVersion": "v1",
//!   "responsePayload": "{ \"results\": {\"ok\":true} }",
//!   "requestStartedAt": "2024-01-01T00:00:00Z",
//!   "requestFinishedAt": "2024-01-01T00:00:01Z"
//! }
//! ```
//!
//! Response fields are empty strings until set; timestamps are omitted until set.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::sockets::is_valid_socket_id;

/// Errors produced when decoding an envelope from bus bytes.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("message id is empty")]
    EmptyId,

    #[error("message id {0:?} is not a valid socket name")]
    InvalidId(String),

    #[error("response payload and response model version must be set together")]
    IncompleteResponse,
}

/// A request/response pair travelling across the bus.
///
/// `id` and `request_payload` are fixed at construction; downstream consumers
/// can only add response data and timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendezvousMessage {
    id: String,
    request_payload: String,
    #[serde(default)]
    response_model_version: String,
    #[serde(default)]
    response_payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_finished_at: Option<DateTime<Utc>>,
}

impl RendezvousMessage {
    /// Create a new request envelope with a freshly generated id.
    pub fn new(request_payload: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), request_payload)
    }

    /// Create a new request envelope with a caller-chosen id.
    pub fn with_id(id: impl Into<String>, request_payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            request_payload: request_payload.into(),
            response_model_version: String::new(),
            response_payload: String::new(),
            request_started_at: None,
            request_finished_at: None,
        }
    }

    /// Decode an envelope from its JSON wire form.
    ///
    /// The id must name a delivery socket, and a response is only accepted
    /// together with the model version that produced it.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let message: Self = serde_json::from_slice(bytes)?;
        if message.id.is_empty() {
            return Err(DecodeError::EmptyId);
        }
        if !is_valid_socket_id(&message.id) {
            return Err(DecodeError::InvalidId(message.id));
        }
        if message.response_payload.is_empty() != message.response_model_version.is_empty() {
            return Err(DecodeError::IncompleteResponse);
        }
        Ok(message)
    }

    /// Encode the envelope to its JSON wire form.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Identifier assigned by the caller; also names its delivery socket.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Opaque request body sent to the model backend.
    pub fn request_payload(&self) -> &str {
        &self.request_payload
    }

    /// Model version that produced the response, empty until answered.
    pub fn response_model_version(&self) -> &str {
        &self.response_model_version
    }

    /// Wrapped response body, empty until answered.
    pub fn response_payload(&self) -> &str {
        &self.response_payload
    }

    /// When the model backend call started.
    pub fn request_started_at(&self) -> Option<DateTime<Utc>> {
        self.request_started_at
    }

    /// When the model backend response was read.
    pub fn request_finished_at(&self) -> Option<DateTime<Utc>> {
        self.request_finished_at
    }

    /// Record the start of the model backend call.
    pub fn set_request_started(&mut self, at: DateTime<Utc>) {
        self.request_started_at = Some(at);
    }

    /// Record the end of the model backend call.
    pub fn set_request_finished(&mut self, at: DateTime<Utc>) {
        self.request_finished_at = Some(at);
    }

    /// Record the model response.
    ///
    /// The raw backend body is embedded verbatim as `{ "results": <body> }`;
    /// it is neither parsed nor validated. Bytes that are not UTF-8 are
    /// replaced with U+FFFD.
    pub fn set_model_response(&mut self, model_version: impl Into<String>, raw_body: &[u8]) {
        self.response_model_version = model_version.into();
        self.response_payload = wrap_results(raw_body);
    }

    /// True once an executor has recorded a model response.
    pub fn has_response(&self) -> bool {
        !self.response_payload.is_empty()
    }

    /// Time spent in the model backend call, if both timestamps are set.
    pub fn request_duration(&self) -> Option<Duration> {
        match (self.request_started_at, self.request_finished_at) {
            (Some(start), Some(finish)) => Some(finish - start),
            _ => None,
        }
    }
}

fn wrap_results(raw_body: &[u8]) -> String {
    format!("{{ \"results\": {} }}", String::from_utf8_lossy(raw_body))
}
