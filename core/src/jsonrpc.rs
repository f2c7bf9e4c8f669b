use serde::Serialize;
use serde_json::{Map, Value, json};

pub const JSONRPC_VERSION: &str = "2.0";

/// Error codes used on the MCP surface
pub mod codes {
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
}

/// A decoded JSON-RPC request.
///
/// `id` is `None` for notifications. An explicit `"id": null` is treated the
/// same as a missing id.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub id: Option<Value>,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: Option<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            id: id.filter(|id| !id.is_null()),
            method: method.into(),
            params,
        }
    }

    /// Lenient decode: missing `method` becomes `""`, missing `params` becomes `{}`.
    /// Returns `None` when the payload is not a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let method = object
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let params = object
            .get("params")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        Some(Self::new(object.get("id").cloned(), method, params))
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    pub fn to_value(&self) -> Value {
        json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": self.id.clone().unwrap_or(Value::Null),
            "method": self.method,
            "params": self.params,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: codes::INVALID_REQUEST,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self {
            code: codes::METHOD_NOT_FOUND,
            message: message.into(),
            data: None,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut payload = json!({
            "code": self.code,
            "message": self.message,
        });
        if let Some(data) = &self.data {
            payload["data"] = data.clone();
        }
        payload
    }
}

pub fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result
    })
}

pub fn error_response(id: Value, error: &RpcError) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": error.to_value()
    })
}
