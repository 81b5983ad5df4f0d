use serde::{Deserialize, Serialize};

use crate::error::RequestId;

pub type JsonValue = serde_json::Value;

/// A request or notification whose `method`/`params` are not yet bound to a
/// typed LSP request. The LSP layer wraps these with typed helpers; this
/// crate only ever moves the shape around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnyRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(default = "JsonValue::default")]
    pub params: JsonValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnyNotification {
    pub method: String,
    #[serde(default = "JsonValue::default")]
    pub params: JsonValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

#[derive(Debug, Clone)]
pub struct AnyResponse {
    pub id: RequestId,
    pub payload: std::result::Result<JsonValue, ResponseError>,
}

impl AnyResponse {
    pub fn new_ok(id: RequestId, value: JsonValue) -> Self {
        Self {
            id,
            payload: Ok(value),
        }
    }

    pub fn new_err(id: RequestId, error: ResponseError) -> Self {
        Self {
            id,
            payload: Err(error),
        }
    }
}

/// Wire-level envelope. Distinguishes request/response/notification purely by
/// which optional fields are present, matching JSON-RPC 2.0's own convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub jsonrpc: JsonRpcVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

/// Always serializes as the literal `"2.0"`; deserialization accepts any
/// string, since some servers are sloppy about the exact value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let _ = String::deserialize(deserializer)?;
        Ok(JsonRpcVersion)
    }
}

impl Envelope {
    pub fn request(id: RequestId, method: String, params: JsonValue) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id: Some(id),
            method: Some(method),
            params: Some(params),
            result: None,
            error: None,
        }
    }

    pub fn notification(method: String, params: JsonValue) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id: None,
            method: Some(method),
            params: Some(params),
            result: None,
            error: None,
        }
    }

    pub fn response_ok(id: RequestId, result: JsonValue) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id: Some(id),
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    pub fn response_err(id: RequestId, error: ResponseError) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id: Some(id),
            method: None,
            params: None,
            result: None,
            error: Some(error),
        }
    }

    /// Whether this envelope is a response to one of our own requests
    /// (carries an id and neither `method` nor `params`... in practice,
    /// requests and responses are disambiguated by the absence of `method`).
    pub fn is_response(&self) -> bool {
        self.id.is_some() && self.method.is_none()
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none() && self.method.is_some()
    }

    pub fn is_request(&self) -> bool {
        self.id.is_some() && self.method.is_some()
    }
}
