use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{JsonRpcError, ResponseError};
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response
///
/// `result` is always written, as `null` for handlers that produce nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: RequestId,
    pub result: Value,
}

impl JsonRpcResponse {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            result,
        }
    }
}

/// Either a successful response or an error response.
///
/// Keeping the two shapes apart means a response can never carry both
/// `result` and `error`, nor neither.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcError),
}

impl ResponseMessage {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Response(JsonRpcResponse::new(id, result))
    }

    pub fn error(id: Option<RequestId>, error: ResponseError) -> Self {
        Self::Error(JsonRpcError::new(id, error))
    }

    /// Build the reply for a handler outcome.
    pub fn from_result(id: RequestId, result: Result<Value, ResponseError>) -> Self {
        match result {
            Ok(value) => Self::success(id, value),
            Err(error) => Self::error(Some(id), error),
        }
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        matches!(self, ResponseMessage::Error(_))
    }

    /// Get the request ID from either response or error
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            ResponseMessage::Response(resp) => Some(&resp.id),
            ResponseMessage::Error(err) => err.id.as_ref(),
        }
    }

    /// Settle into the value a caller of the request sees.
    pub fn into_result(self) -> Result<Value, ResponseError> {
        match self {
            ResponseMessage::Response(resp) => Ok(resp.result),
            ResponseMessage::Error(err) => Err(err.error),
        }
    }
}

impl From<JsonRpcResponse> for ResponseMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for ResponseMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}
