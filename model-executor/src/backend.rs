//! Model backend client.
//!
//! The executor treats the model as an opaque HTTP endpoint: the request
//! payload is POSTed as-is and the raw response body is returned whatever the
//! status code.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

/// Model backend errors.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("error calling model endpoint: {0}")]
    Request(String),

    #[error("error reading model response: {0}")]
    Body(String),
}

/// A model that turns a request body into a response body.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn invoke(&self, request: &[u8]) -> Result<Vec<u8>, BackendError>;
}

/// HTTP model backend.
pub struct HttpModelBackend {
    http_client: Client,
    endpoint: String,
}

impl HttpModelBackend {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl ModelBackend for HttpModelBackend {
    async fn invoke(&self, request: &[u8]) -> Result<Vec<u8>, BackendError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(request.to_vec())
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        // Non-success responses are passed through to the caller unchanged
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                status = %status.as_u16(),
                endpoint = %self.endpoint,
                "Model endpoint returned non-success status"
            );
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Body(e.to_string()))?;

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> HttpModelBackend {
        HttpModelBackend::new(&format!("{}/predict", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_posts_request_payload_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"{"features":[1,2,3]}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let body = backend_for(&server)
            .invoke(br#"{"features":[1,2,3]}"#)
            .await
            .unwrap();

        assert_eq!(body, br#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_non_success_status_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"error":"oom"}"#))
            .mount(&server)
            .await;

        let body = backend_for(&server).invoke(b"q").await.unwrap();
        assert_eq!(body, br#"{"error":"oom"}"#);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Reserve a port, then release it so nothing is listening there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/predict", listener.local_addr().unwrap());
        drop(listener);

        let backend = HttpModelBackend::new(&endpoint, Duration::from_secs(5)).unwrap();
        let result = backend.invoke(b"q").await;

        assert!(matches!(result, Err(BackendError::Request(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_a_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let backend =
            HttpModelBackend::new(&format!("{}/predict", server.uri()), Duration::from_millis(50)).unwrap();
        let result = backend.invoke(b"q").await;

        assert!(matches!(result, Err(BackendError::Request(_))));
    }
}
