//! Header-delimited framing of JSON-RPC envelopes.
//!
//! Each frame is an ASCII header block (`Name: Value` lines, each ending in
//! `\r\n`, closed by an empty line) followed by exactly `Content-Length`
//! bytes of JSON:
//!
//! ```text
//! Content-Length: 43\r\n
//! \r\n
//! {"jsonrpc":"2.0","id":1,"method":"example"}
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

mod header;
pub mod reader;
pub mod writer;

pub use header::MessageHeaders;
pub use reader::{MessageReader, PartialMessageInfo};
pub use writer::MessageWriter;

pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Text encoding of a frame body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentEncoding {
    #[default]
    Utf8,
    /// Non-ASCII characters are written as `\uXXXX` escapes.
    Ascii,
}

impl ContentEncoding {
    /// Recognise a `charset=` value from a `Content-Type` header.
    pub fn from_charset(charset: &str) -> Option<Self> {
        match charset.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(ContentEncoding::Utf8),
            "ascii" | "us-ascii" => Some(ContentEncoding::Ascii),
            _ => None,
        }
    }
}

/// Reader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderOptions {
    /// How long a frame body may stay incomplete before the partial
    /// message callback fires
    #[serde(with = "duration_serde")]
    pub partial_message_timeout: Duration,

    /// Largest header block accepted before the stream is treated as corrupt
    #[serde(default = "default_max_header_size")]
    pub max_header_size: usize,
}

fn default_max_header_size() -> usize {
    64 * 1024
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            partial_message_timeout: Duration::from_secs(10),
            max_header_size: default_max_header_size(),
        }
    }
}

impl ReaderOptions {
    pub fn with_partial_message_timeout(mut self, timeout: Duration) -> Self {
        self.partial_message_timeout = timeout;
        self
    }

    pub fn with_max_header_size(mut self, max_header_size: usize) -> Self {
        self.max_header_size = max_header_size;
        self
    }
}

/// Writer configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WriterOptions {
    /// Body encoding
    pub encoding: ContentEncoding,

    /// Extra header lines written after `Content-Length`
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

impl WriterOptions {
    pub fn with_encoding(mut self, encoding: ContentEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

// Durations travel as milliseconds
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
