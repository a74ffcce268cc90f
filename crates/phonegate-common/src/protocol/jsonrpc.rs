//! JSON-RPC 2.0 envelopes for the worker RPC surface
//!
//! Softphone workers speak JSON-RPC 2.0 over HTTP POST. The gateway only ever
//! acts as a client, so this module carries the request envelope it sends and
//! the response/error envelopes it has to decode.
//!
//! - Request: `{"jsonrpc": "2.0", "method": "...", "params": ..., "id": ...}`
//! - Response: `{"jsonrpc": "2.0", "result": ..., "error": ..., "id": ...}`
//! - Error: `{"code": ..., "message": "...", "data": ...}`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// JSON-RPC 2.0 request sent to a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version, always "2.0"
    pub jsonrpc: String,
    /// Worker method to invoke
    pub method: String,
    /// Method parameters
    pub params: Value,
    /// Request identifier echoed back by the worker
    pub id: Value,
}

impl JsonRpcRequest {
    /// Builds a request with a process-unique numeric id.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        let id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: Value::from(id),
        }
    }
}

/// JSON-RPC 2.0 response returned by a worker.
///
/// Exactly one of `result` and `error` is expected to be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// The method does not exist on the worker
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Invalid method parameter(s)
pub const INVALID_PARAMS: i32 = -32602;
/// Application error raised by the worker
pub const SERVER_ERROR: i32 = -32000;

impl JsonRpcError {
    pub fn method_not_found() -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: "Method not found".into(),
            data: None,
        }
    }

    pub fn invalid_params(msg: &str) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: msg.into(),
            data: None,
        }
    }

    pub fn server_error(msg: &str) -> Self {
        Self {
            code: SERVER_ERROR,
            message: msg.into(),
            data: None,
        }
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_ids_are_unique() {
        let a = JsonRpcRequest::new("list_identities", json!({}));
        let b = JsonRpcRequest::new("list_identities", json!({}));
        assert_ne!(a.id, b.id);
        assert_eq!(a.jsonrpc, "2.0");
    }

    #[test]
    fn test_request_serialization() {
        let req = JsonRpcRequest::new("hold_call", json!({"call_id": "c1"}));
        let serialized = serde_json::to_string(&req).unwrap();
        assert!(serialized.contains("\"jsonrpc\":\"2.0\""));
        assert!(serialized.contains("\"method\":\"hold_call\""));
        assert!(serialized.contains("\"call_id\":\"c1\""));
    }

    #[test]
    fn test_response_without_error_field() {
        let json = r#"{"jsonrpc":"2.0","result":{"success":true},"id":7}"#;
        let res: JsonRpcResponse = serde_json::from_str(json).unwrap();
        assert_eq!(res.result, Some(json!({"success": true})));
        assert!(res.error.is_none());
        assert_eq!(res.id, json!(7));
    }

    #[test]
    fn test_response_with_error_deserialization() {
        let json = r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":1}"#;
        let res: JsonRpcResponse = serde_json::from_str(json).unwrap();
        assert!(res.result.is_none());
        assert_eq!(res.error, Some(JsonRpcError::method_not_found()));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(JsonRpcError::method_not_found().code, -32601);
        assert_eq!(JsonRpcError::invalid_params("x").code, -32602);
        assert_eq!(JsonRpcError::server_error("x").code, -32000);
    }

    #[test]
    fn test_error_display() {
        let err = JsonRpcError::server_error("line busy");
        assert_eq!(err.to_string(), "line busy (code -32000)");
    }
}
