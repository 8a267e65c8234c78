//! End-to-end rendezvous: caller -> executors -> collector -> caller socket.

use std::sync::Arc;

use async_trait::async_trait;
use model_executor::{BackendError, Executor, ExecutorConfig, ModelBackend};
use rendezvous_collector::{Collector, CollectorConfig, Outcome};
use rendezvous_common::messaging::MemoryTopic;
use rendezvous_common::sockets::{MemorySocketWriter, UnixSocketWriter};
use rendezvous_common::{socket_address, RendezvousMessage, SocketWriter};
use tokio::io::AsyncReadExt;
use tokio::net::UnixListener;

struct StaticBackend(&'static str);

#[async_trait]
impl ModelBackend for StaticBackend {
    async fn invoke(&self, _request: &[u8]) -> Result<Vec<u8>, BackendError> {
        Ok(self.0.as_bytes().to_vec())
    }
}

/// One executor per model version, each on its own request subscription,
/// all publishing to the shared response topic.
fn executor(version: &str, body: &'static str, responses: &MemoryTopic) -> (MemoryTopic, Executor) {
    let requests = MemoryTopic::new();
    let executor = Executor::new(
        Box::new(requests.consumer()),
        Box::new(responses.producer()),
        Arc::new(StaticBackend(body)),
        ExecutorConfig {
            model_version: version.to_string(),
            model_endpoint: "http://unused".to_string(),
            request_timeout_secs: 5,
            subscription: None,
        },
    )
    .unwrap();
    (requests, executor)
}

fn collector(responses: &MemoryTopic, writer: Arc<dyn SocketWriter>, active: &str, socket_dir: &str) -> Collector {
    Collector::new(
        Box::new(responses.consumer()),
        writer,
        CollectorConfig {
            active_model_version: active.to_string(),
            socket_dir: socket_dir.to_string(),
            subscription: None,
        },
    )
}

#[tokio::test]
async fn test_only_active_version_reaches_the_caller() {
    let responses = MemoryTopic::new();
    let (v1_requests, mut v1) = executor("v1", r#"{"ok":true}"#, &responses);
    let (v2_requests, mut v2) = executor("v2", r#"{"ok":false}"#, &responses);

    let request = RendezvousMessage::with_id("m1", "q").encode().unwrap();
    v1_requests.publish(request.clone()).unwrap();
    v2_requests.publish(request).unwrap();
    v2.handle_next_message().await.unwrap();
    v1.handle_next_message().await.unwrap();

    let writer = MemorySocketWriter::new();
    let mut gateway = collector(&responses, Arc::new(writer.clone()), "v1", "/sockets");

    let first = gateway.handle_next_message().await.unwrap();
    let second = gateway.handle_next_message().await.unwrap();

    assert_eq!(
        first,
        Outcome::Skipped {
            id: "m1".to_string(),
            model_version: "v2".to_string(),
        }
    );
    assert!(matches!(second, Outcome::Delivered { .. }));
    assert_eq!(
        writer.writes(),
        vec![(
            socket_address("/sockets", "m1").unwrap(),
            b"{ \"results\": {\"ok\":true} }".to_vec()
        )]
    );
}

#[tokio::test]
async fn test_no_active_collector_means_no_delivery() {
    let responses = MemoryTopic::new();
    let (requests, mut v1) = executor("v1", r#"{"ok":true}"#, &responses);
    requests
        .publish(RendezvousMessage::with_id("m1", "q").encode().unwrap())
        .unwrap();
    v1.handle_next_message().await.unwrap();

    let writer = MemorySocketWriter::new();
    let mut gateway = collector(&responses, Arc::new(writer.clone()), "v2", "/sockets");

    assert!(matches!(
        gateway.handle_next_message().await.unwrap(),
        Outcome::Skipped { .. }
    ));
    assert!(writer.writes().is_empty());
}

#[tokio::test]
async fn test_delivery_over_unix_socket() {
    let dir = tempfile::tempdir().unwrap();
    let socket_dir = dir.path().to_str().unwrap().to_string();

    // The caller opens its private socket before publishing
    let request = RendezvousMessage::new("q");
    let listener = UnixListener::bind(socket_address(&socket_dir, request.id()).unwrap()).unwrap();
    let caller = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    });

    let responses = MemoryTopic::new();
    let (requests, mut v1) = executor("v1", r#"{"score":0.97}"#, &responses);
    requests.publish(request.encode().unwrap()).unwrap();
    v1.handle_next_message().await.unwrap();

    let mut gateway = collector(&responses, Arc::new(UnixSocketWriter::new()), "v1", &socket_dir);
    gateway.handle_next_message().await.unwrap();

    assert_eq!(caller.await.unwrap(), r#"{ "results": {"score":0.97} }"#);
}

#[tokio::test]
async fn test_caller_gone_is_a_delivery_error() {
    let dir = tempfile::tempdir().unwrap();
    let socket_dir = dir.path().to_str().unwrap().to_string();

    // Only the second caller is still waiting
    let listener = UnixListener::bind(socket_address(&socket_dir, "waiting").unwrap()).unwrap();
    let caller = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    });

    let responses = MemoryTopic::new();
    let (requests, mut v1) = executor("v1", "[]", &responses);
    for id in ["gone", "waiting"] {
        requests
            .publish(RendezvousMessage::with_id(id, "q").encode().unwrap())
            .unwrap();
        v1.handle_next_message().await.unwrap();
    }

    let mut gateway = collector(&responses, Arc::new(UnixSocketWriter::new()), "v1", &socket_dir);

    let err = gateway.handle_next_message().await.unwrap_err();
    assert!(matches!(err, rendezvous_collector::Error::Delivery(_)));
    assert!(!err.is_fatal());

    let outcome = gateway.handle_next_message().await.unwrap();
    assert!(matches!(outcome, Outcome::Delivered { ref id, .. } if id == "waiting"));
    assert_eq!(caller.await.unwrap(), r#"{ "results": [] }"#);
}
