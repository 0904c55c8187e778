//! Session error types.

use thiserror::Error;

use crate::types::VertexError;

/// Payload handed to handlers when a command cannot reach the engine.
pub const NOT_ACTIVE: &str = "not active";

/// Result type for session operations.
pub type GtpResult<T> = Result<T, GtpError>;

/// Errors surfaced by the GTP session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GtpError {
    /// The engine process is not running (or died while waiting).
    #[error("engine not active")]
    NotActive,

    /// A startup probe failed; the process instance is unusable.
    #[error("handshake failed on `{command}`: {message}")]
    HandshakeFailed { command: String, message: String },

    /// The engine answered with a `?` failure response.
    #[error("engine error: {0}")]
    Protocol(String),

    /// No response within the caller's bound.
    #[error("timed out waiting for engine response")]
    Timeout,

    /// The engine did not finish its handshake in time.
    #[error("engine not ready")]
    NotReady,

    /// The launcher could not start the engine.
    #[error("failed to launch engine: {0}")]
    Launch(String),

    /// Vertex text did not decode to a move on the current board.
    #[error(transparent)]
    InvalidVertex(#[from] VertexError),
}
