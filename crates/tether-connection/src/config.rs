//! Configuration types for message connections

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tether_json_rpc::codec::{ContentEncoding, ReaderOptions, WriterOptions};

/// Message tracing level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trace {
    #[default]
    Off,
    /// Method names and ids only
    Messages,
    /// Also params, results and error data
    Verbose,
}

impl Trace {
    pub fn is_on(&self) -> bool {
        !matches!(self, Trace::Off)
    }
}

/// Main connection configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Inbound framing
    #[serde(default)]
    pub reader: ReaderOptions,

    /// Outbound framing
    #[serde(default)]
    pub writer: WriterOptions,

    /// Message tracing through the logger's `log` channel
    #[serde(default)]
    pub trace: Trace,
}

impl ConnectionOptions {
    pub fn with_partial_message_timeout(mut self, timeout: Duration) -> Self {
        self.reader.partial_message_timeout = timeout;
        self
    }

    pub fn with_encoding(mut self, encoding: ContentEncoding) -> Self {
        self.writer.encoding = encoding;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.writer = self.writer.with_header(name, value);
        self
    }

    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = trace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = ConnectionOptions::default();
        assert_eq!(options.reader.partial_message_timeout, Duration::from_secs(10));
        assert_eq!(options.writer.encoding, ContentEncoding::Utf8);
        assert!(!options.trace.is_on());
    }

    #[test]
    fn test_deserializes_partial_config() {
        let options: ConnectionOptions = serde_json::from_value(json!({
            "reader": {"partial_message_timeout": 500},
            "trace": "verbose"
        }))
        .unwrap();

        assert_eq!(options.reader.partial_message_timeout, Duration::from_millis(500));
        assert_eq!(options.trace, Trace::Verbose);
        assert!(options.writer.headers.is_empty());
    }

    #[test]
    fn test_builder_setters() {
        let options = ConnectionOptions::default()
            .with_partial_message_timeout(Duration::from_millis(100))
            .with_encoding(ContentEncoding::Ascii)
            .with_header("Content-Type", "application/vscode-jsonrpc; charset=ascii")
            .with_trace(Trace::Messages);

        assert_eq!(options.writer.headers.len(), 1);
        assert_eq!(options.writer.encoding, ContentEncoding::Ascii);
        assert_eq!(options.trace, Trace::Messages);
    }
}
