//! Request cancellation forwarded over the wire

use serde_json::{Value, json};
use std::time::Duration;
use tether_connection::args;
use tether_connection::prelude::*;
use tether_json_rpc::codec::{MessageReader, MessageWriter};
use tether_json_rpc::{JsonRpcEnvelope, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use tether_test_shared::{ConnectedPair, init_tracing};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

const SLOW: RequestType = RequestType::new("test/slow", 0);

async fn within<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

fn wait_for_cancellation(pair: &ConnectedPair) {
    pair.server.on_request(&SLOW, |_params, token: CancellationToken| async move {
        token.cancelled().await;
        Err(ResponseError::request_cancelled())
    });
}

struct RawPeer {
    reader: MessageReader<ReadHalf<DuplexStream>>,
    writer: MessageWriter<WriteHalf<DuplexStream>>,
}

impl RawPeer {
    async fn next(&mut self) -> JsonRpcEnvelope {
        within(self.reader.next_message())
            .await
            .expect("stream ended")
            .expect("read failed")
    }

    async fn cancel(&mut self, params: Value) {
        let notification = JsonRpcNotification::new("$/cancelRequest".to_string(), Some(params));
        self.writer.write(&notification.into()).await.unwrap();
    }
}

fn connection_with_raw_peer() -> (MessageConnection, RawPeer) {
    let (local, remote) = tokio::io::duplex(64 * 1024);
    let (local_read, local_write) = tokio::io::split(local);
    let (remote_read, remote_write) = tokio::io::split(remote);
    let connection = MessageConnection::new(local_read, local_write, NullLogger);
    let peer = RawPeer {
        reader: MessageReader::new(remote_read),
        writer: MessageWriter::new(remote_write),
    };
    (connection, peer)
}

#[tokio::test]
async fn test_cancel_reaches_server_handler() {
    init_tracing();
    let pair = ConnectedPair::new();
    wait_for_cancellation(&pair);
    pair.listen();

    let source = CancellationTokenSource::new();
    let pending = pair
        .client
        .send_request_with_token(&SLOW, args![], &source.token())
        .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    source.cancel();

    let error = within(pending).await.unwrap_err();
    assert_eq!(error.kind(), JsonRpcErrorCode::RequestCancelled);
    assert_eq!(error.code, -32800);
}

#[tokio::test]
async fn test_already_cancelled_token_sends_cancel_after_request() {
    let (connection, mut peer) = connection_with_raw_peer();
    connection.listen().unwrap();

    let source = CancellationTokenSource::new();
    source.cancel();
    let _pending = connection
        .send_request_with_token(&SLOW, args![], &source.token())
        .unwrap();

    match peer.next().await {
        JsonRpcEnvelope::Request(request) => {
            assert_eq!(request.method, "test/slow");
            assert_eq!(request.id, RequestId::Number(1));
        }
        other => panic!("expected request, got {:?}", other),
    }
    match peer.next().await {
        JsonRpcEnvelope::Notification(notification) => {
            assert_eq!(notification.method, "$/cancelRequest");
            assert_eq!(notification.params, Some(json!({"id": 1})));
        }
        other => panic!("expected cancellation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_after_response_sends_nothing() {
    let (connection, mut peer) = connection_with_raw_peer();
    connection.listen().unwrap();

    let source = CancellationTokenSource::new();
    let pending = connection
        .send_request_with_token(&SLOW, args![], &source.token())
        .unwrap();

    let id = match peer.next().await {
        JsonRpcEnvelope::Request(request) => request.id,
        other => panic!("expected request, got {:?}", other),
    };
    peer.writer
        .write(&JsonRpcResponse::new(id, json!("done")).into())
        .await
        .unwrap();
    assert_eq!(within(pending).await.unwrap(), json!("done"));

    source.cancel();
    connection.send_notification("test/after", args![]).unwrap();

    assert_eq!(peer.next().await.method(), Some("test/after"));
}

#[tokio::test]
async fn test_unknown_cancellation_is_ignored() {
    let (connection, mut peer) = connection_with_raw_peer();
    connection.on_request("echo", |params, _token| async move { Ok(params.into_value()) });
    connection.listen().unwrap();

    peer.cancel(json!({"id": 99})).await;
    peer.cancel(json!("bogus")).await;
    let request = JsonRpcRequest::new(RequestId::Number(7), "echo".to_string(), Some(json!("hi")));
    peer.writer.write(&request.into()).await.unwrap();

    match peer.next().await {
        JsonRpcEnvelope::Response(response) => {
            assert_eq!(response.id(), Some(&RequestId::Number(7)));
            assert_eq!(response.into_result().unwrap(), json!("hi"));
        }
        other => panic!("expected response, got {:?}", other),
    }
    assert!(connection.is_listening());
}

#[tokio::test]
async fn test_string_ids_cancel_too() {
    let (connection, mut peer) = connection_with_raw_peer();
    connection.on_request(&SLOW, |_params, token: CancellationToken| async move {
        token.cancelled().await;
        Err(ResponseError::request_cancelled())
    });
    connection.listen().unwrap();

    let id = RequestId::String("abc".to_string());
    peer.writer
        .write(&JsonRpcRequest::new_no_params(id.clone(), "test/slow".to_string()).into())
        .await
        .unwrap();
    peer.cancel(json!({"id": "abc"})).await;

    match peer.next().await {
        JsonRpcEnvelope::Response(response) => {
            assert_eq!(response.id(), Some(&id));
            assert_eq!(
                response.into_result().unwrap_err().kind(),
                JsonRpcErrorCode::RequestCancelled
            );
        }
        other => panic!("expected response, got {:?}", other),
    }
}

#[tokio::test]
async fn test_dispose_cancels_inbound_requests() {
    let pair = ConnectedPair::new();
    let (observed_tx, mut observed_rx) = mpsc::unbounded_channel();
    pair.server.on_request(&SLOW, move |_params, token: CancellationToken| {
        let observed_tx = observed_tx.clone();
        async move {
            token.cancelled().await;
            let _ = observed_tx.send(());
            Err(ResponseError::request_cancelled())
        }
    });
    pair.listen();

    let pending = pair.client.send_request(&SLOW, args![]).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    pair.server.dispose();
    within(observed_rx.recv()).await.unwrap();

    // The disposed server never answers
    pair.client.dispose();
    let error = within(pending).await.unwrap_err();
    assert_eq!(error.kind(), JsonRpcErrorCode::PendingResponseRejected);
}
