//! Value types shared by the media engine binding and the signaling protocol

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an object owned by the media server (pipeline, endpoint, filter)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// An ICE candidate as exchanged with the browser
///
/// Serialized with the browser's `RTCIceCandidateInit` key names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    /// Candidate line, e.g. `candidate:1 1 UDP 2122252543 192.168.1.2 50000 typ host`
    pub candidate: String,
    /// Media stream identification tag
    #[serde(rename = "sdpMid")]
    pub sdp_mid: String,
    /// Index of the media description the candidate belongs to
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_m_line_index: u32,
}

impl IceCandidate {
    pub fn new(
        candidate: impl Into<String>,
        sdp_mid: impl Into<String>,
        sdp_m_line_index: u32,
    ) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: sdp_mid.into(),
            sdp_m_line_index,
        }
    }
}

/// Image drawn over every detected face
///
/// Offsets and sizes are fractions of the detected face box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayImage {
    pub uri: String,
    pub offset_x: f32,
    pub offset_y: f32,
    pub width: f32,
    pub height: f32,
}

/// Default overlay image URI
pub const DEFAULT_OVERLAY_URI: &str = "http://files.kurento.org/img/mario-wings.png";

impl Default for OverlayImage {
    fn default() -> Self {
        Self {
            uri: DEFAULT_OVERLAY_URI.to_string(),
            offset_x: -0.35,
            offset_y: -1.2,
            width: 1.6,
            height: 1.6,
        }
    }
}
