//! Test fixtures

use parking_lot::Mutex;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tether_connection::{ConnectionOptions, MessageConnection, TracingLogger};
use tokio::io::AsyncWrite;
use tracing::debug;

/// Install a `tracing` subscriber honoring `RUST_LOG`; safe to call from
/// every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Shared view of every write a [`RecordingWriter`] received
#[derive(Debug, Clone, Default)]
pub struct WriteLog {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl WriteLog {
    /// Each write call's bytes, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// All bytes written so far
    pub fn concatenated(&self) -> Vec<u8> {
        self.writes.lock().concat()
    }
}

/// An `AsyncWrite` sink that accepts everything and records each write
/// call as a separate chunk
#[derive(Debug, Default)]
pub struct RecordingWriter {
    log: WriteLog,
}

impl RecordingWriter {
    pub fn new() -> (Self, WriteLog) {
        let writer = Self::default();
        let log = writer.log.clone();
        (writer, log)
    }
}

impl AsyncWrite for RecordingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.log.writes.lock().push(buf.to_vec());
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Two connections wired back to back over in-memory pipes
pub struct ConnectedPair {
    pub client: MessageConnection,
    pub server: MessageConnection,
}

impl ConnectedPair {
    pub fn new() -> Self {
        Self::with_options(ConnectionOptions::default())
    }

    pub fn with_options(options: ConnectionOptions) -> Self {
        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client_end);
        let (server_read, server_write) = tokio::io::split(server_end);

        let server = MessageConnection::with_options(
            server_read,
            server_write,
            TracingLogger,
            options.clone(),
        );
        let client =
            MessageConnection::with_options(client_read, client_write, TracingLogger, options);
        debug!("Connected client and server over in-memory pipes");

        Self { client, server }
    }

    /// Start both sides listening
    pub fn listen(&self) {
        self.client.listen().expect("client listen");
        self.server.listen().expect("server listen");
    }
}

impl Default for ConnectedPair {
    fn default() -> Self {
        Self::new()
    }
}
