use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::types::{JsonRpcVersion, RequestId};

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
    UnknownErrorCode,
    PendingResponseRejected,
    ConnectionInactive,
    RequestCancelled,
    MessageWriteError,
    MessageReadError,
    /// Any other code carried by an application error
    Application(i64),
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => -32700,
            JsonRpcErrorCode::InvalidRequest => -32600,
            JsonRpcErrorCode::MethodNotFound => -32601,
            JsonRpcErrorCode::InvalidParams => -32602,
            JsonRpcErrorCode::InternalError => -32603,
            JsonRpcErrorCode::ServerError(code) => *code,
            JsonRpcErrorCode::UnknownErrorCode => -32001,
            JsonRpcErrorCode::PendingResponseRejected => -32097,
            JsonRpcErrorCode::ConnectionInactive => -32096,
            JsonRpcErrorCode::RequestCancelled => -32800,
            JsonRpcErrorCode::MessageWriteError => 1,
            JsonRpcErrorCode::MessageReadError => 2,
            JsonRpcErrorCode::Application(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError(_) => "Server error",
            JsonRpcErrorCode::UnknownErrorCode => "Unknown error",
            JsonRpcErrorCode::PendingResponseRejected => "Pending response rejected",
            JsonRpcErrorCode::ConnectionInactive => "Connection inactive",
            JsonRpcErrorCode::RequestCancelled => "Request cancelled",
            JsonRpcErrorCode::MessageWriteError => "Message write error",
            JsonRpcErrorCode::MessageReadError => "Message read error",
            JsonRpcErrorCode::Application(_) => "Application error",
        }
    }

    /// Map a numeric code back onto the taxonomy. The well-known codes are
    /// matched first, so -32001 and -32097 never land in `ServerError`.
    pub fn from_code(code: i64) -> Self {
        match code {
            -32700 => JsonRpcErrorCode::ParseError,
            -32600 => JsonRpcErrorCode::InvalidRequest,
            -32601 => JsonRpcErrorCode::MethodNotFound,
            -32602 => JsonRpcErrorCode::InvalidParams,
            -32603 => JsonRpcErrorCode::InternalError,
            -32001 => JsonRpcErrorCode::UnknownErrorCode,
            -32097 => JsonRpcErrorCode::PendingResponseRejected,
            -32096 => JsonRpcErrorCode::ConnectionInactive,
            -32800 => JsonRpcErrorCode::RequestCancelled,
            1 => JsonRpcErrorCode::MessageWriteError,
            2 => JsonRpcErrorCode::MessageReadError,
            -32099..=-32000 => JsonRpcErrorCode::ServerError(code),
            other => JsonRpcErrorCode::Application(other),
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// The error object carried by an error response.
///
/// This is also what a failed request surfaces to its caller and what a
/// request handler returns to fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message} (code {code})")]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    /// An error with an application-defined code, passed through untouched.
    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn kind(&self) -> JsonRpcErrorCode {
        JsonRpcErrorCode::from_code(self.code)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, None, data)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            Some(format!("Unhandled method {}", method)),
            None,
        )
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::InvalidParams,
            Some(message.to_string()),
            None,
        )
    }

    pub fn internal_error(message: Option<String>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, message, None)
    }

    pub fn request_cancelled() -> Self {
        Self::new(JsonRpcErrorCode::RequestCancelled, None, None)
    }
}

impl From<serde_json::Error> for ResponseError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_params(&err.to_string())
    }
}

impl From<anyhow::Error> for ResponseError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ResponseError>() {
            Ok(response_error) => response_error,
            Err(other) => Self::internal_error(Some(format!("{:#}", other))),
        }
    }
}

/// JSON-RPC Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: Option<RequestId>,
    pub error: ResponseError,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: ResponseError) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            error,
        }
    }

    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, ResponseError::invalid_request(None))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Failures while turning inbound bytes into envelopes.
///
/// `InvalidHeader`, `MissingContentLength`, `Truncated` and `Io` end the
/// reader. The others are confined to a single frame.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid message header: {0}")]
    InvalidHeader(String),

    #[error("Header must provide a Content-Length property")]
    MissingContentLength,

    #[error("Unsupported content encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Stream ended with an incomplete message ({received} of {expected:?} bytes)")]
    Truncated {
        expected: Option<usize>,
        received: usize,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid message: {0}")]
    InvalidMessage(JsonRpcError),
}

impl ReadError {
    /// Whether the reader can keep going after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReadError::UnsupportedEncoding(_) | ReadError::Parse(_) | ReadError::InvalidMessage(_)
        )
    }
}

/// Failures while framing an envelope onto the sink.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialize error: {0}")]
    Json(#[from] serde_json::Error),
}
