//! One-shot invoke client.
//!
//! Opens a WebSocket connection to a peer, sends a single
//! [`MeshMessage::Invoke`] frame, and waits for one response frame. Every
//! failure mode collapses to a `None` completion at the caller; the detail
//! is logged here.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::warn;

use lattice_proto::{MeshMessage, MeshResponse};

/// Timeout for establishing the connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for the response frame.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur during a single invoke exchange.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// Connecting to or talking over the socket failed.
    #[error("connection error: {0}")]
    Connection(String),
    /// The exchange did not complete within the timeout.
    #[error("request timed out")]
    Timeout,
    /// The peer sent something that is not a valid response.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The peer answered with a wire-level error.
    #[error("peer error {code}: {message}")]
    Peer {
        /// Wire error code.
        code: u32,
        /// Peer-supplied description.
        message: String,
    },
}

/// Performs one invoke exchange, mapping every failure to `None`.
pub(crate) async fn invoke(url: String, endpoint: String, payload: Value) -> Option<Value> {
    match try_invoke(&url, &endpoint, payload).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(url = %url, endpoint = %endpoint, error = %e, "Invoke failed");
            None
        }
    }
}

/// Performs one invoke exchange against `url`.
///
/// # Errors
///
/// Returns an error if the connection, the exchange, or decoding fails, or
/// if the peer reports a wire-level error.
pub(crate) async fn try_invoke(
    url: &str,
    endpoint: &str,
    payload: Value,
) -> Result<Option<Value>, InvokeError> {
    let (mut ws, _response) = timeout(CONNECT_TIMEOUT, connect_async(url))
        .await
        .map_err(|_| InvokeError::Timeout)?
        .map_err(|e| InvokeError::Connection(e.to_string()))?;

    let frame = MeshMessage::Invoke {
        endpoint: endpoint.to_string(),
        payload,
    }
    .to_json()
    .map_err(|e| InvokeError::Protocol(e.to_string()))?;

    ws.send(Message::Text(frame))
        .await
        .map_err(|e| InvokeError::Connection(e.to_string()))?;

    let response = timeout(RESPONSE_TIMEOUT, ws.next())
        .await
        .map_err(|_| InvokeError::Timeout)?
        .ok_or_else(|| InvokeError::Connection("connection closed".into()))?
        .map_err(|e| InvokeError::Connection(e.to_string()))?;

    let result = match response {
        Message::Text(text) => {
            match MeshResponse::from_json(&text)
                .map_err(|e| InvokeError::Protocol(e.to_string()))?
            {
                MeshResponse::Result { payload } => Ok(payload),
                MeshResponse::Error { code, message } => Err(InvokeError::Peer { code, message }),
            }
        }
        Message::Close(_) => Err(InvokeError::Connection("connection closed by peer".into())),
        _ => Err(InvokeError::Protocol("unexpected message type".into())),
    };

    let _ = ws.close(None).await;
    result
}
