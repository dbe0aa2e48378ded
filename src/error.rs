//! Error types for nntp-client.

use thiserror::Error;

/// Main error type for all NNTP operations.
#[derive(Debug, Error)]
pub enum NntpError {
    /// Transport failure. The connection has been closed and must be
    /// re-established.
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// TLS configuration or handshake failure.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The server answered with an unexpected status code.
    ///
    /// The connection is still usable.
    #[error("Unexpected reply from server: expected {expected}, got {code} {message}")]
    Server {
        /// Status code the server sent.
        code: u16,
        /// Status code the command required.
        expected: u16,
        /// Remainder of the status line.
        message: String,
    },

    /// Malformed response text (missing tokens, bad status line, ...).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Malformed or inconsistent yEnc data.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A single protocol unit did not fit in the configured buffer cap.
    #[error("Response exceeds buffer limit of {limit} bytes")]
    BufferExceeded {
        /// Configured maximum buffer size.
        limit: usize,
    },

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation attempted on a connection that is not open.
    #[error("Not connected")]
    NotConnected,
}

impl NntpError {
    /// Whether this error left the connection unusable.
    ///
    /// Server, protocol and decode errors leave the stream in sync, so the
    /// caller may keep issuing commands on the same connection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NntpError::Network(_)
                | NntpError::Tls(_)
                | NntpError::BufferExceeded { .. }
                | NntpError::NotConnected
        )
    }

    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        NntpError::Decode(msg.into())
    }
}

/// Result type alias using NntpError.
pub type Result<T> = std::result::Result<T, NntpError>;
