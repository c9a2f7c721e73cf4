use bytes::BytesMut;
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{HEADER_TERMINATOR, MessageHeaders, ReaderOptions};
use crate::error::ReadError;
use crate::message::JsonRpcEnvelope;

/// Diagnostics for a frame whose body is slow to arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialMessageInfo {
    /// Sequence number of the frame on this reader, starting at 1
    pub message_token: u64,
    /// Time since the header block completed
    pub waiting_time: Duration,
    pub bytes_received: usize,
    pub content_length: usize,
}

type PartialMessageCallback = Box<dyn FnMut(PartialMessageInfo) + Send>;
type ErrorCallback = Box<dyn FnMut(ReadError) + Send>;
type CloseCallback = Box<dyn FnOnce() + Send>;

/// Callbacks for reader events other than a parsed message
#[derive(Default)]
struct ReaderCallbacks {
    partial_message: Option<PartialMessageCallback>,
    error: Option<ErrorCallback>,
    close: Option<CloseCallback>,
}

impl fmt::Debug for ReaderCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderCallbacks")
            .field("partial_message", &self.partial_message.as_ref().map(|_| "function"))
            .field("error", &self.error.as_ref().map(|_| "function"))
            .field("close", &self.close.as_ref().map(|_| "function"))
            .finish()
    }
}

/// Turns an inbound byte stream into a sequence of envelopes.
///
/// The reader alternates between a header phase (accumulate until the blank
/// line, parse `Content-Length`) and a body phase (accumulate exactly that
/// many bytes). A corrupt body only costs its own frame; a broken header or
/// a stream that ends mid-frame ends the sequence.
#[derive(Debug)]
pub struct MessageReader<R> {
    reader: R,
    buffer: BytesMut,
    options: ReaderOptions,
    callbacks: ReaderCallbacks,
    message_token: u64,
    finished: bool,
}

impl<R> MessageReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ReaderOptions::default())
    }

    pub fn with_options(reader: R, options: ReaderOptions) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(8 * 1024),
            options,
            callbacks: ReaderCallbacks::default(),
            message_token: 0,
            finished: false,
        }
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn set_partial_message_timeout(&mut self, timeout: Duration) {
        self.options.partial_message_timeout = timeout;
    }

    /// Set the callback fired once per frame whose body is still incomplete
    /// after the partial message timeout. Reception carries on regardless.
    pub fn on_partial_message<F>(&mut self, callback: F)
    where
        F: FnMut(PartialMessageInfo) + Send + 'static,
    {
        self.callbacks.partial_message = Some(Box::new(callback));
    }

    /// Set the callback for read errors seen by [`MessageReader::listen`]
    pub fn on_error<F>(&mut self, callback: F)
    where
        F: FnMut(ReadError) + Send + 'static,
    {
        self.callbacks.error = Some(Box::new(callback));
    }

    /// Set the callback fired when [`MessageReader::listen`] stops
    pub fn on_close<F>(&mut self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.callbacks.close = Some(Box::new(callback));
    }

    /// Whether the sequence has ended
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read the next envelope.
    ///
    /// Returns `None` once the stream has ended or after a fatal error.
    /// Recoverable errors (see [`ReadError::is_recoverable`]) leave the
    /// reader positioned at the next frame.
    pub async fn next_message(&mut self) -> Option<Result<JsonRpcEnvelope, ReadError>> {
        if self.finished {
            return None;
        }

        let headers = match self.read_headers().await {
            Ok(Some(headers)) => headers,
            Ok(None) => return None,
            Err(e) => return Some(Err(self.fail(e))),
        };

        self.message_token += 1;
        let content_length = headers.content_length;
        if let Err(e) = self.read_body(content_length).await {
            return Some(Err(self.fail(e)));
        }
        let body = self.buffer.split_to(content_length);

        if let Err(e) = headers.encoding() {
            return Some(Err(e));
        }

        Some(JsonRpcEnvelope::from_slice(&body))
    }

    async fn read_headers(&mut self) -> Result<Option<MessageHeaders>, ReadError> {
        // Bytes before `searched` are known not to start a terminator
        let mut searched = 0;
        loop {
            let found =
                find_terminator(&self.buffer[searched..]).map(|offset| searched + offset);
            let scanned = found.unwrap_or(self.buffer.len());
            if scanned > self.options.max_header_size {
                return Err(ReadError::InvalidHeader(format!(
                    "header block exceeds {} bytes",
                    self.options.max_header_size
                )));
            }
            if let Some(end) = found {
                let block = self.buffer.split_to(end + HEADER_TERMINATOR.len());
                return MessageHeaders::parse(&block[..end]).map(Some);
            }
            searched = self
                .buffer
                .len()
                .saturating_sub(HEADER_TERMINATOR.len() - 1);

            let read = self.reader.read_buf(&mut self.buffer).await?;
            if read == 0 {
                self.finished = true;
                if self.buffer.iter().all(u8::is_ascii_whitespace) {
                    debug!("Inbound stream ended");
                    return Ok(None);
                }
                return Err(ReadError::Truncated {
                    expected: None,
                    received: self.buffer.len(),
                });
            }
        }
    }

    async fn read_body(&mut self, content_length: usize) -> Result<(), ReadError> {
        let started = Instant::now();
        let deadline = started + self.options.partial_message_timeout;
        let mut reported = false;

        while self.buffer.len() < content_length {
            let read = if reported {
                self.reader.read_buf(&mut self.buffer).await?
            } else {
                let next = self.reader.read_buf(&mut self.buffer);
                match tokio::time::timeout_at(deadline, next).await {
                    Ok(read) => read?,
                    Err(_) => {
                        reported = true;
                        let info = PartialMessageInfo {
                            message_token: self.message_token,
                            waiting_time: started.elapsed(),
                            bytes_received: self.buffer.len(),
                            content_length,
                        };
                        debug!(?info, "Partial message");
                        if let Some(callback) = self.callbacks.partial_message.as_mut() {
                            callback(info);
                        }
                        continue;
                    }
                }
            };

            if read == 0 {
                return Err(ReadError::Truncated {
                    expected: Some(content_length),
                    received: self.buffer.len(),
                });
            }
        }
        Ok(())
    }

    fn fail(&mut self, error: ReadError) -> ReadError {
        self.finished = true;
        error
    }
}

impl<R> MessageReader<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Drain the envelope sequence on a background task.
    ///
    /// `on_message` sees every envelope in arrival order, errors go to the
    /// `on_error` callback and `on_close` fires once the sequence ends.
    pub fn listen<F>(mut self, mut on_message: F) -> JoinHandle<()>
    where
        F: FnMut(JsonRpcEnvelope) + Send + 'static,
    {
        tokio::spawn(async move {
            debug!("Message reader started");

            while let Some(next) = self.next_message().await {
                match next {
                    Ok(envelope) => on_message(envelope),
                    Err(error) => {
                        warn!(error = %error, "Failed to read message");
                        if let Some(callback) = self.callbacks.error.as_mut() {
                            callback(error);
                        }
                    }
                }
            }

            if let Some(callback) = self.callbacks.close.take() {
                callback();
            }
            debug!("Message reader stopped");
        })
    }
}

fn find_terminator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}
