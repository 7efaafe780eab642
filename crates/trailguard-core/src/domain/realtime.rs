//! Messages pushed over the per-project realtime WebSocket.
//!
//! The server sends a `{"type": "connected", ...}` handshake on accept and
//! then relays whatever the processing pipeline publishes for the project.
//! Only the `type` tag is interpreted here.

use serde::{Deserialize, Serialize};

/// Tag of the handshake frame sent right after the socket is accepted.
pub const HANDSHAKE_KIND: &str = "connected";

/// One realtime message for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl ProjectEvent {
    /// Parses one text frame.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the frame is not a JSON object
    /// with a string `type` field.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// `true` for the connection handshake, which carries no data change.
    pub fn is_handshake(&self) -> bool {
        self.kind == HANDSHAKE_KIND
    }
}
