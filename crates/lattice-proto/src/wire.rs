//! Wire envelopes for the discovery and invoke channels.
//!
//! Messages are JSON with an internal `type` tag:
//!
//! ```json
//! {"type": "invoke", "endpoint": "reserve", "payload": {"sku": "a-17"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtoError;
use crate::types::Peer;

/// Protocol version spoken on both mesh channels.
pub const MESH_PROTOCOL_VERSION: u32 = 1;

/// Error codes carried in [`MeshResponse::Error`].
pub mod error_codes {
    /// The frame could not be decoded or was not valid on this channel.
    pub const INVALID_REQUEST: u32 = 400;
    /// The invoked endpoint is not registered on the receiving node.
    pub const UNKNOWN_ENDPOINT: u32 = 404;
}

/// Messages sent between mesh nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeshMessage {
    /// Periodic presence announcement on the discovery channel.
    Announce {
        /// The announcing peer's current record.
        peer: Peer,
        /// Protocol version of the announcer.
        protocol_version: u32,
    },

    /// Invoke a named endpoint on the receiving node.
    Invoke {
        /// Endpoint to invoke.
        endpoint: String,
        /// Request payload, forwarded to the endpoint handler verbatim.
        payload: Value,
    },
}

impl MeshMessage {
    /// Creates an announcement for the given peer record.
    #[must_use]
    pub fn announce(peer: Peer) -> Self {
        Self::Announce {
            peer,
            protocol_version: MESH_PROTOCOL_VERSION,
        }
    }

    /// Returns a short name for the message kind, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Announce { .. } => "announce",
            Self::Invoke { .. } => "invoke",
        }
    }

    /// Serializes the message to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Deserializes a message from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid message.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }
}

/// Responses sent on the invoke channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeshResponse {
    /// The endpoint handler ran.
    Result {
        /// Payload returned by the handler; `None` when it returned nothing.
        payload: Option<Value>,
    },

    /// The invoke could not be serviced.
    Error {
        /// One of [`error_codes`].
        code: u32,
        /// Human-readable description.
        message: String,
    },
}

impl MeshResponse {
    /// Creates an error response.
    #[must_use]
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// Serializes the response to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Deserializes a response from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid response.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }
}
