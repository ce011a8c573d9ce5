//! Error types for the push transport.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Synchronous failures are returned directly, socket failures arrive
//! through a failed [`AsyncResult`](crate::AsyncResult):
//!
//! ```ignore
//! use push_transport::{ClientTransport, ConnectionType, Result};
//!
//! async fn example(transport: &WebSocketTransport, conn: &Connection) -> Result<()> {
//!     transport.start(conn, ConnectionType::InitialConnection, callback).await?;
//!     transport.send(conn, "hello".into(), callback)?.await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Transport | [`Error::Transport`], [`Error::ConnectionClosed`], [`Error::Superseded`] |
//! | External | [`Error::InvalidUrl`], [`Error::WebSocket`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;
use url::ParseError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned synchronously when the transport is used before it was
    /// started, or when the connection carries values that cannot be
    /// turned into a socket request.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Socket-level failure.
    ///
    /// Reported by the socket layer during the handshake or while the
    /// connection is live.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the socket failure.
        message: String,
    },

    /// The socket was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A newer `start()` replaced the socket before it opened.
    #[error("Start superseded by a newer connection attempt")]
    Superseded,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// URL parse error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::InvalidUrl(_))
    }

    /// Returns `true` if this error came from the socket layer.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::WebSocket(_))
    }

    /// Returns `true` if the connection is gone or was never usable.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::ConnectionClosed
                | Self::Superseded
                | Self::WebSocket(_)
                | Self::ChannelClosed(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::transport("ECONNRESET");
        assert_eq!(err.to_string(), "Transport error: ECONNRESET");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("transport not started");
        assert_eq!(
            err.to_string(),
            "Configuration error: transport not started"
        );
        assert!(err.is_config_error());
        assert!(!err.is_transport_error());
    }

    #[test]
    fn test_is_transport_error() {
        assert!(Error::transport("reset").is_transport_error());
        assert!(!Error::ConnectionClosed.is_transport_error());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::Superseded.is_connection_error());
        assert!(Error::transport("reset").is_connection_error());
        assert!(!Error::config("bad").is_connection_error());
    }

    #[test]
    fn test_from_url_error() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert!(err.is_config_error());
    }
}
