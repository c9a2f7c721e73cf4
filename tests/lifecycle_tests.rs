//! Listening, closing and disposal across a connected pair

use serde_json::{Value, json};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tether_connection::args;
use tether_connection::prelude::*;
use tether_test_shared::{ConnectedPair, init_tracing};
use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, oneshot};

const DISPOSE: RequestType = RequestType::new("test/dispose", 0);
const NEVER: RequestType = RequestType::new("test/never", 0);

async fn within<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

/// A sink whose every write fails
struct BrokenPipe;

impl AsyncWrite for BrokenPipe {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_dispose_during_request_rejects_pending() {
    init_tracing();
    let pair = ConnectedPair::new();
    let client = pair.client.clone();
    pair.server.on_request(&DISPOSE, move |_params, _token| {
        let client = client.clone();
        async move {
            client.dispose();
            Ok(Value::Null)
        }
    });
    pair.listen();

    let error = within(pair.client.send_request(&DISPOSE, args![]).unwrap())
        .await
        .unwrap_err();
    assert_eq!(error.kind(), JsonRpcErrorCode::PendingResponseRejected);
    assert_eq!(error.message, "The connection got disposed.");
    assert!(pair.client.is_disposed());
    assert_eq!(pair.client.pending_request_count(), 0);
}

#[tokio::test]
async fn test_dispose_rejects_every_pending_request() {
    let pair = ConnectedPair::new();
    pair.server
        .on_request(&NEVER, |_params, _token| futures::future::pending());
    pair.listen();

    let first = pair.client.send_request(&NEVER, args![]).unwrap();
    let second = pair.client.send_request(&NEVER, args![]).unwrap();
    assert_eq!(pair.client.pending_request_count(), 2);

    pair.client.dispose();

    for pending in [first, second] {
        let error = within(pending).await.unwrap_err();
        assert_eq!(error.kind(), JsonRpcErrorCode::PendingResponseRejected);
    }
}

#[tokio::test]
async fn test_sends_fail_after_dispose() {
    let pair = ConnectedPair::new();
    pair.listen();
    pair.client.dispose();

    assert_eq!(
        pair.client.send_notification("test/notify", args![1]).unwrap_err(),
        ConnectionError::Disposed
    );
    assert_eq!(
        pair.client.send_request("test/request", args![]).unwrap_err(),
        ConnectionError::Disposed
    );

    let error: ResponseError = ConnectionError::Disposed.into();
    assert_eq!(error.kind(), JsonRpcErrorCode::PendingResponseRejected);
}

#[tokio::test]
async fn test_listen_twice_fails() {
    let pair = ConnectedPair::new();
    pair.client.listen().unwrap();

    assert_eq!(pair.client.listen().unwrap_err(), ConnectionError::AlreadyListening);
    assert!(pair.client.is_listening());
}

#[tokio::test]
async fn test_listen_after_dispose_fails() {
    let pair = ConnectedPair::new();
    pair.client.dispose();

    assert_eq!(pair.client.listen().unwrap_err(), ConnectionError::Disposed);
    assert_eq!(pair.client.state(), ConnectionState::Disposed);
}

#[tokio::test]
async fn test_dispose_listener_fires_once() {
    let pair = ConnectedPair::new();
    pair.listen();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    pair.client.on_dispose(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    pair.client.dispose();
    pair.client.dispose();
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // Late registration fires right away
    let counter = Arc::clone(&fired);
    pair.client.on_dispose(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_peer_dispose_closes_inbound_stream() {
    let pair = ConnectedPair::new();
    let (close_tx, close_rx) = oneshot::channel();
    pair.server.on_close(move || {
        let _ = close_tx.send(());
    });
    pair.listen();

    pair.client.dispose();
    within(close_rx).await.unwrap();

    // Closing the inbound side alone does not dispose
    assert!(pair.server.is_listening());

    let (late_tx, late_rx) = oneshot::channel();
    pair.server.on_close(move || {
        let _ = late_tx.send(());
    });
    within(late_rx).await.unwrap();
}

#[tokio::test]
async fn test_write_failure_reports_and_disposes() {
    init_tracing();
    let connection = MessageConnection::new(tokio::io::empty(), BrokenPipe, NullLogger);

    let (error_tx, mut error_rx) = mpsc::unbounded_channel();
    connection.on_error(move |error| {
        let _ = error_tx.send((error.to_string(), error.is_recoverable()));
    });
    let (dispose_tx, dispose_rx) = oneshot::channel();
    connection.on_dispose(move || {
        let _ = dispose_tx.send(());
    });

    let pending = connection.send_request("test/request", args![json!({"a": 1})]).unwrap();

    let (message, recoverable) = within(error_rx.recv()).await.unwrap();
    assert!(message.contains("pipe closed"));
    assert!(!recoverable);

    within(dispose_rx).await.unwrap();
    assert!(connection.is_disposed());

    let error = within(pending).await.unwrap_err();
    assert_eq!(error.kind(), JsonRpcErrorCode::PendingResponseRejected);
}

#[tokio::test]
async fn test_server_keeps_serving_after_client_requests_finish() {
    let pair = ConnectedPair::new();
    pair.server
        .on_request("ping", |_params, _token| async { Ok(json!("pong")) });
    pair.listen();

    for _ in 0..3 {
        let result = within(pair.client.send_request("ping", args![]).unwrap()).await;
        assert_eq!(result.unwrap(), json!("pong"));
    }
    assert_eq!(pair.client.pending_request_count(), 0);
    assert!(pair.server.is_listening());
}
