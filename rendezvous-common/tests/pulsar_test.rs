//! Tests for the Pulsar WebSocket transport against a local stand-in broker.

use futures_util::{SinkExt, StreamExt};
use rendezvous_common::messaging::PulsarClient;
use rendezvous_common::{Consumer, MessagingConfig, MessagingError, Producer};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

async fn start_broker() -> (TcpListener, MessagingConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = MessagingConfig {
        url: format!("ws://{}", addr),
        ..Default::default()
    };
    (listener, config)
}

async fn accept(listener: &TcpListener) -> WebSocketStream<tokio::net::TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

async fn next_json(ws: &mut WebSocketStream<tokio::net::TcpStream>) -> Value {
    let message = ws.next().await.unwrap().unwrap();
    serde_json::from_str(&message.into_text().unwrap()).unwrap()
}

#[tokio::test]
async fn test_consumer_receives_and_acknowledges() {
    let (listener, config) = start_broker().await;

    let broker = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let frame = json!({
            "messageId": "CAAQAw==",
            "payload": "aGVsbG8=",
            "properties": {},
            "publishTime": "2024-01-01T00:00:00.000Z",
            "redeliveryCount": 0
        });
        ws.send(Message::Text(frame.to_string())).await.unwrap();
        next_json(&mut ws).await
    });

    let client = PulsarClient::new(config);
    let mut consumer = client.create_consumer("model-input", "model-input-v1").await.unwrap();

    assert_eq!(consumer.receive().await.unwrap(), b"hello");
    assert_eq!(broker.await.unwrap(), json!({"messageId": "CAAQAw=="}));
}

#[tokio::test]
async fn test_consumer_reports_closed_connection() {
    let (listener, config) = start_broker().await;

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        ws.close(None).await.unwrap();
    });

    let client = PulsarClient::new(config);
    let mut consumer = client.create_consumer("model-input", "sub").await.unwrap();

    assert!(matches!(consumer.receive().await, Err(MessagingError::Closed)));
}

#[tokio::test]
async fn test_producer_waits_for_broker_ack() {
    let (listener, config) = start_broker().await;

    let broker = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let frame = next_json(&mut ws).await;
        let reply = json!({
            "result": "ok",
            "messageId": "CAAQAw==",
            "context": frame["context"]
        });
        ws.send(Message::Text(reply.to_string())).await.unwrap();
        frame
    });

    let client = PulsarClient::new(config);
    let mut producer = client.create_producer("model-response").await.unwrap();
    producer.send(b"hello").await.unwrap();

    let frame = broker.await.unwrap();
    assert_eq!(frame["payload"], "aGVsbG8=");
    assert_eq!(frame["context"], "1");
}

#[tokio::test]
async fn test_producer_surfaces_broker_rejection() {
    let (listener, config) = start_broker().await;

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let frame = next_json(&mut ws).await;
        let reply = json!({
            "result": "send-error:3",
            "errorMsg": "topic terminated",
            "context": frame["context"]
        });
        ws.send(Message::Text(reply.to_string())).await.unwrap();
        // Keep the connection open until the client is done
        let _ = ws.next().await;
    });

    let client = PulsarClient::new(config);
    let mut producer = client.create_producer("model-response").await.unwrap();

    match producer.send(b"hello").await {
        Err(MessagingError::Send(reason)) => assert_eq!(reason, "topic terminated"),
        other => panic!("expected send error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connect_failure() {
    let (listener, config) = start_broker().await;
    drop(listener);

    let client = PulsarClient::new(config);
    let result = client.create_producer("model-response").await;

    assert!(matches!(result, Err(MessagingError::Connect(_))));
}
