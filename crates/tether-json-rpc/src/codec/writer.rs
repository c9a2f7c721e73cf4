use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::{CONTENT_LENGTH, ContentEncoding, WriterOptions};
use crate::error::WriteError;
use crate::message::JsonRpcEnvelope;

/// Frames envelopes onto an outbound byte sink.
///
/// Every envelope is emitted as two separate writes, the header block and
/// then the body, followed by a flush. Nothing is buffered between calls.
#[derive(Debug)]
pub struct MessageWriter<W> {
    writer: W,
    options: WriterOptions,
}

impl<W> MessageWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, WriterOptions::default())
    }

    pub fn with_options(writer: W, options: WriterOptions) -> Self {
        Self { writer, options }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Serialize and frame one envelope.
    pub async fn write(&mut self, envelope: &JsonRpcEnvelope) -> Result<(), WriteError> {
        let body = encode_body(envelope, self.options.encoding)?;
        let header = header_block(body.len(), &self.options.headers);

        debug!(content_length = body.len(), "Writing message frame");

        self.write_frame(header.as_bytes(), &body).await?;
        Ok(())
    }

    async fn write_frame(&mut self, header: &[u8], body: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(header).await?;
        self.writer.write_all(body).await?;
        self.writer.flush().await
    }

    /// Shut down the underlying sink.
    pub async fn shutdown(&mut self) -> Result<(), WriteError> {
        self.writer.shutdown().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Build the header block for a body of `content_length` bytes.
pub fn header_block(content_length: usize, extra: &[(String, String)]) -> String {
    let mut header = format!("{}: {}\r\n", CONTENT_LENGTH, content_length);
    for (name, value) in extra {
        header.push_str(name);
        header.push_str(": ");
        header.push_str(value);
        header.push_str("\r\n");
    }
    header.push_str("\r\n");
    header
}

/// Serialize an envelope into body bytes in the given encoding.
pub fn encode_body(
    envelope: &JsonRpcEnvelope,
    encoding: ContentEncoding,
) -> Result<Vec<u8>, WriteError> {
    let json = serde_json::to_string(envelope)?;
    Ok(match encoding {
        ContentEncoding::Utf8 => json.into_bytes(),
        ContentEncoding::Ascii => escape_non_ascii(json).into_bytes(),
    })
}

// Non-ASCII characters only ever occur inside JSON strings, where a
// \uXXXX escape is equivalent.
fn escape_non_ascii(json: String) -> String {
    if json.is_ascii() {
        return json;
    }
    let mut escaped = String::with_capacity(json.len() + 16);
    let mut units = [0u16; 2];
    for ch in json.chars() {
        if ch.is_ascii() {
            escaped.push(ch);
        } else {
            for unit in ch.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    escaped
}
