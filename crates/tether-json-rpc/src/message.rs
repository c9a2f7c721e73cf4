use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    error::{JsonRpcError, ReadError, ResponseError},
    notification::JsonRpcNotification,
    request::JsonRpcRequest,
    response::{JsonRpcResponse, ResponseMessage},
    types::RequestId,
};

/// One JSON-RPC message unit as it travels on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JsonRpcEnvelope {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(ResponseMessage),
}

impl JsonRpcEnvelope {
    /// Decode a frame body and classify it.
    pub fn from_slice(body: &[u8]) -> Result<Self, ReadError> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(value).map_err(ReadError::InvalidMessage)
    }

    /// Classify a decoded JSON object by the presence of `id`, `method`,
    /// `result` and `error`.
    pub fn from_value(value: Value) -> Result<Self, JsonRpcError> {
        let Value::Object(obj) = value else {
            return Err(JsonRpcError::invalid_request(None));
        };

        let id = obj.get("id").and_then(RequestId::from_value);

        match obj.get("jsonrpc") {
            Some(version) if version == "2.0" => {}
            _ => return Err(JsonRpcError::invalid_request(id)),
        }

        if obj.contains_key("method") {
            return if obj.contains_key("id") {
                serde_json::from_value::<JsonRpcRequest>(Value::Object(obj))
                    .map(JsonRpcEnvelope::Request)
                    .map_err(|_| JsonRpcError::invalid_request(id))
            } else {
                serde_json::from_value::<JsonRpcNotification>(Value::Object(obj))
                    .map(JsonRpcEnvelope::Notification)
                    .map_err(|_| JsonRpcError::invalid_request(None))
            };
        }

        if obj.contains_key("id") {
            return classify_response(obj, id).map(JsonRpcEnvelope::Response);
        }

        Err(JsonRpcError::invalid_request(None))
    }

    /// Get the method name, for requests and notifications
    pub fn method(&self) -> Option<&str> {
        match self {
            JsonRpcEnvelope::Request(req) => Some(&req.method),
            JsonRpcEnvelope::Notification(notif) => Some(&notif.method),
            JsonRpcEnvelope::Response(_) => None,
        }
    }

    /// Get the id, for requests and responses
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcEnvelope::Request(req) => Some(&req.id),
            JsonRpcEnvelope::Notification(_) => None,
            JsonRpcEnvelope::Response(resp) => resp.id(),
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, JsonRpcEnvelope::Request(_))
    }

    pub fn is_notification(&self) -> bool {
        matches!(self, JsonRpcEnvelope::Notification(_))
    }

    pub fn is_response(&self) -> bool {
        matches!(self, JsonRpcEnvelope::Response(_))
    }
}

fn classify_response(
    mut obj: Map<String, Value>,
    id: Option<RequestId>,
) -> Result<ResponseMessage, JsonRpcError> {
    match (obj.remove("result"), obj.remove("error")) {
        (Some(result), None) => {
            let id = id.ok_or_else(|| JsonRpcError::invalid_request(None))?;
            Ok(ResponseMessage::Response(JsonRpcResponse::new(id, result)))
        }
        (None, Some(error)) => {
            let error: ResponseError = serde_json::from_value(error)
                .map_err(|_| JsonRpcError::invalid_request(id.clone()))?;
            Ok(ResponseMessage::Error(JsonRpcError::new(id, error)))
        }
        _ => Err(JsonRpcError::invalid_request(id)),
    }
}

impl From<JsonRpcRequest> for JsonRpcEnvelope {
    fn from(request: JsonRpcRequest) -> Self {
        Self::Request(request)
    }
}

impl From<JsonRpcNotification> for JsonRpcEnvelope {
    fn from(notification: JsonRpcNotification) -> Self {
        Self::Notification(notification)
    }
}

impl From<ResponseMessage> for JsonRpcEnvelope {
    fn from(response: ResponseMessage) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcResponse> for JsonRpcEnvelope {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(ResponseMessage::Response(response))
    }
}

impl From<JsonRpcError> for JsonRpcEnvelope {
    fn from(error: JsonRpcError) -> Self {
        Self::Response(ResponseMessage::Error(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonRpcErrorCode;
    use serde_json::json;

    fn classify(value: Value) -> Result<JsonRpcEnvelope, JsonRpcError> {
        JsonRpcEnvelope::from_value(value)
    }

    #[test]
    fn test_classifies_request() {
        let envelope = classify(json!({"jsonrpc": "2.0", "id": 1, "method": "example"})).unwrap();
        assert!(envelope.is_request());
        assert_eq!(envelope.method(), Some("example"));
        assert_eq!(envelope.id(), Some(&RequestId::Number(1)));
    }

    #[test]
    fn test_classifies_notification() {
        let envelope =
            classify(json!({"jsonrpc": "2.0", "method": "note", "params": [1, 2]})).unwrap();
        assert!(envelope.is_notification());
        assert_eq!(envelope.id(), None);
    }

    #[test]
    fn test_classifies_responses() {
        let success = classify(json!({"jsonrpc": "2.0", "id": "a", "result": null})).unwrap();
        match success {
            JsonRpcEnvelope::Response(ResponseMessage::Response(resp)) => {
                assert_eq!(resp.result, Value::Null)
            }
            other => panic!("expected success response, got {:?}", other),
        }

        let failure = classify(json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": {"code": -32700, "message": "Parse error"}
        }))
        .unwrap();
        match failure {
            JsonRpcEnvelope::Response(ResponseMessage::Error(err)) => {
                assert!(err.id.is_none());
                assert_eq!(err.error.kind(), JsonRpcErrorCode::ParseError);
            }
            other => panic!("expected error response, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_response_with_both_or_neither() {
        let both = classify(json!({
            "jsonrpc": "2.0", "id": 1, "result": 1,
            "error": {"code": 1, "message": "x"}
        }));
        assert_eq!(both.unwrap_err().id, Some(RequestId::Number(1)));

        let neither = classify(json!({"jsonrpc": "2.0", "id": 1}));
        assert_eq!(
            neither.unwrap_err().error.kind(),
            JsonRpcErrorCode::InvalidRequest
        );
    }

    #[test]
    fn test_rejects_malformed_envelopes() {
        assert!(classify(json!([1, 2, 3])).is_err());
        assert!(classify(json!({"jsonrpc": "1.0", "id": 1, "method": "m"})).is_err());
        assert!(classify(json!({"jsonrpc": "2.0", "id": 1, "method": 7})).is_err());
        assert!(classify(json!({"jsonrpc": "2.0"})).is_err());
    }

    #[test]
    fn test_from_slice_reports_parse_errors() {
        let err = JsonRpcEnvelope::from_slice(b"{not json").unwrap_err();
        assert!(matches!(err, ReadError::Parse(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_serialized_envelope_parses_back() {
        let request = JsonRpcRequest::new(
            RequestId::Number(9),
            "m".to_string(),
            Some(json!([0, null, "", [1, 2]])),
        );
        let bytes = serde_json::to_vec(&JsonRpcEnvelope::from(request.clone())).unwrap();
        match JsonRpcEnvelope::from_slice(&bytes).unwrap() {
            JsonRpcEnvelope::Request(parsed) => assert_eq!(parsed, request),
            other => panic!("expected request, got {:?}", other),
        }
    }
}
