//! Kurento JSON-RPC 2.0 protocol types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::media::{IceCandidate, ObjectId, OverlayImage};

/// JSON-RPC 2.0 protocol version
pub const JSONRPC_VERSION: &str = "2.0";

/// Method names understood by the media server
pub mod methods {
    pub const PING: &str = "ping";
    pub const CREATE: &str = "create";
    pub const INVOKE: &str = "invoke";
    pub const SUBSCRIBE: &str = "subscribe";
    pub const RELEASE: &str = "release";
    /// Server to client event notification
    pub const ON_EVENT: &str = "onEvent";
}

/// Event types carrying a locally discovered ICE candidate
pub mod events {
    pub const ICE_CANDIDATE_FOUND: &str = "IceCandidateFound";
    /// Name used by media servers older than 6.2
    pub const ON_ICE_CANDIDATE: &str = "OnIceCandidate";
}

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    /// Protocol version (must be "2.0")
    pub jsonrpc: String,

    /// Method name to invoke
    pub method: String,

    /// Method parameters
    pub params: Value,

    /// Request ID for matching with response (absent for notifications)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: Option<u64>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorObject {
    /// Error code
    pub code: i64,

    /// Human-readable error message
    pub message: String,

    /// Additional error data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Any message received from the media server, before classification
#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorObject>,
}

/// A classified message from the media server
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Successful response to request `id`
    Response { id: u64, result: Value },
    /// Error response; `id` is None when the server could not parse the request
    Error { id: Option<u64>, error: ErrorObject },
    /// Server-initiated notification
    Notification { method: String, params: Value },
}

impl RawMessage {
    /// Classify the message; None when it is neither a response nor a notification
    pub fn classify(self) -> Option<Incoming> {
        let id = self.id.as_ref().and_then(Value::as_u64);

        if let Some(error) = self.error {
            return Some(Incoming::Error { id, error });
        }
        if let Some(method) = self.method {
            return Some(Incoming::Notification {
                method,
                params: self.params.unwrap_or(Value::Null),
            });
        }
        match (id, self.result) {
            (Some(id), Some(result)) => Some(Incoming::Response { id, result }),
            (Some(id), None) => Some(Incoming::Response {
                id,
                result: Value::Null,
            }),
            _ => None,
        }
    }
}

/// Body of an `onEvent` notification
#[derive(Debug, Clone, Deserialize)]
pub struct EventParams {
    pub value: EventValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub object: ObjectId,
    #[serde(default)]
    pub data: Value,
}

impl EventValue {
    /// The candidate carried by an ICE candidate event
    pub fn ice_candidate(&self) -> Option<IceCandidate> {
        if self.kind != events::ICE_CANDIDATE_FOUND && self.kind != events::ON_ICE_CANDIDATE {
            return None;
        }
        let candidate = self.data.get("candidate")?;
        serde_json::from_value(candidate.clone()).ok()
    }
}

/// Params for `create`
pub fn create_params(kind: &str, pipeline: Option<&ObjectId>) -> Map<String, Value> {
    let constructor_params = match pipeline {
        Some(pipeline) => json!({ "mediaPipeline": pipeline }),
        None => json!({}),
    };
    let mut params = Map::new();
    params.insert("type".to_string(), Value::from(kind));
    params.insert("constructorParams".to_string(), constructor_params);
    params.insert("properties".to_string(), json!({}));
    params
}

/// Params for `invoke`
pub fn invoke_params(object: &ObjectId, operation: &str, args: Value) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("object".to_string(), Value::from(object.as_str()));
    params.insert("operation".to_string(), Value::from(operation));
    params.insert("operationParams".to_string(), args);
    params
}

/// Params for `subscribe`
pub fn subscribe_params(object: &ObjectId, event: &str) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("type".to_string(), Value::from(event));
    params.insert("object".to_string(), Value::from(object.as_str()));
    params
}

/// Params for `release`
pub fn release_params(object: &ObjectId) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("object".to_string(), Value::from(object.as_str()));
    params
}

/// Params for `ping`
pub fn ping_params(interval_ms: u64) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("interval".to_string(), Value::from(interval_ms));
    params
}

/// `operationParams` for `setOverlayedImage`
pub fn overlay_args(image: &OverlayImage) -> Value {
    json!({
        "uri": image.uri,
        "offsetXPercent": image.offset_x,
        "offsetYPercent": image.offset_y,
        "widthPercent": image.width,
        "heightPercent": image.height,
    })
}

/// A candidate as the media server's complex type
pub fn candidate_arg(candidate: &IceCandidate) -> Value {
    json!({
        "__module__": "kurento",
        "__type__": "IceCandidate",
        "candidate": candidate.candidate,
        "sdpMid": candidate.sdp_mid,
        "sdpMLineIndex": candidate.sdp_m_line_index,
    })
}
