//! Browser signaling protocol
//!
//! Every message is a JSON object tagged by its `id` field.

use mirror_core::IceCandidate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ServerError;

/// Messages sent from the browser to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "id", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Begin a session by negotiating an SDP offer
    Start {
        #[serde(rename = "sdpOffer")]
        sdp_offer: String,
    },

    /// End the session
    Stop,

    /// ICE candidate gathered by the browser
    OnIceCandidate { candidate: IceCandidate },
}

/// Messages sent from the server to the browser
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "id", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Answer to a `start` offer
    StartResponse {
        #[serde(rename = "sdpAnswer")]
        sdp_answer: String,
    },

    /// ICE candidate discovered by the media server
    IceCandidate { candidate: IceCandidate },

    /// Any failure; the session is torn down after this is sent
    Error { message: String },
}

const KNOWN_IDS: [&str; 3] = ["start", "stop", "onIceCandidate"];

/// A parsed inbound text frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(ClientMessage),
    /// Well-formed message whose `id` is not part of the protocol
    Unrecognized(String),
}

/// Parse an inbound text frame
///
/// Unknown ids are reported as [`Inbound::Unrecognized`] rather than as
/// errors so the caller can answer with the offending id.
pub fn parse_client_message(text: &str) -> Result<Inbound, ServerError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ServerError::InvalidMessage(format!("not a JSON message: {}", e)))?;

    let id = match value.get("id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => {
            return Err(ServerError::InvalidMessage(
                "missing string field `id`".to_string(),
            ));
        }
    };

    if !KNOWN_IDS.contains(&id.as_str()) {
        return Ok(Inbound::Unrecognized(id));
    }

    serde_json::from_value(value)
        .map(Inbound::Message)
        .map_err(|e| ServerError::InvalidMessage(format!("{}: {}", id, e)))
}
