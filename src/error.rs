//! Error types
//!
//! Protocol validation failures are not errors: malformed ingest payloads are
//! dropped and malformed control messages become `Errors` replies. This type
//! covers transport, serialization, route loading and configuration.

use std::path::PathBuf;

use tokio_tungstenite::tungstenite;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket-level I/O failure (bind, accept, read, write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Websocket handshake or framing failure
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The peer closed the connection
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// A route definition could not be loaded
    #[error("route {}: {reason}", .path.display())]
    Route { path: PathBuf, reason: String },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error is an ordinary peer disconnect rather than a fault
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::ConnectionClosed => true,
            Error::WebSocket(tungstenite::Error::Io(e)) | Error::Io(e) => is_reset(e),
            Error::WebSocket(e) => matches!(
                e,
                tungstenite::Error::ConnectionClosed
                    | tungstenite::Error::AlreadyClosed
                    | tungstenite::Error::Protocol(
                        tungstenite::error::ProtocolError::ResetWithoutClosingHandshake
                            | tungstenite::error::ProtocolError::SendAfterClosing
                    )
            ),
            _ => false,
        }
    }
}

fn is_reset(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
    )
}
