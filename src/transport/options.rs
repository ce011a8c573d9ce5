//! Socket configuration options.
//!
//! # Example
//!
//! ```ignore
//! use push_transport::SocketOptions;
//!
//! let options = SocketOptions::new()
//!     .with_max_message_size(1 << 20)
//!     .with_header("User-Agent", "push-transport")
//!     .with_nodelay();
//! ```

// ============================================================================
// Imports
// ============================================================================

use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::error::{Error, Result};

// ============================================================================
// SocketOptions
// ============================================================================

/// Options applied to every socket a transport opens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketOptions {
    /// Largest inbound message accepted, `None` for the library default.
    pub max_message_size: Option<usize>,

    /// Largest inbound frame accepted, `None` for the library default.
    pub max_frame_size: Option<usize>,

    /// Set `TCP_NODELAY` on the underlying stream.
    pub disable_nagle: bool,

    /// Headers added to every upgrade request.
    pub headers: Vec<(String, String)>,
}

// ============================================================================
// Constructors
// ============================================================================

impl SocketOptions {
    /// Creates options with library defaults.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_message_size: None,
            max_frame_size: None,
            disable_nagle: false,
            headers: Vec::new(),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SocketOptions {
    /// Sets the maximum inbound message size in bytes.
    #[inline]
    #[must_use]
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = Some(bytes);
        self
    }

    /// Sets the maximum inbound frame size in bytes.
    #[inline]
    #[must_use]
    pub fn with_max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = Some(bytes);
        self
    }

    /// Disables Nagle's algorithm.
    #[inline]
    #[must_use]
    pub fn with_nodelay(mut self) -> Self {
        self.disable_nagle = true;
        self
    }

    /// Adds a header to every upgrade request.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

// ============================================================================
// Conversion
// ============================================================================

impl SocketOptions {
    /// Checks size limits for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a limit is zero or the frame limit
    /// exceeds the message limit.
    pub fn validate(&self) -> Result<()> {
        if self.max_message_size == Some(0) || self.max_frame_size == Some(0) {
            return Err(Error::config("Socket size limits must be non-zero"));
        }

        if let (Some(message), Some(frame)) = (self.max_message_size, self.max_frame_size)
            && frame > message
        {
            return Err(Error::config(format!(
                "max_frame_size ({frame}) exceeds max_message_size ({message})"
            )));
        }

        Ok(())
    }

    /// Converts to the tungstenite socket configuration.
    #[must_use]
    pub fn to_ws_config(&self) -> WebSocketConfig {
        let mut config = WebSocketConfig::default();
        if self.max_message_size.is_some() {
            config = config.max_message_size(self.max_message_size);
        }
        if self.max_frame_size.is_some() {
            config = config.max_frame_size(self.max_frame_size);
        }
        config
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_matches_default() {
        assert_eq!(SocketOptions::new(), SocketOptions::default());
    }

    #[test]
    fn test_builder_methods() {
        let options = SocketOptions::new()
            .with_max_message_size(4096)
            .with_max_frame_size(1024)
            .with_nodelay()
            .with_header("X-Test", "1");

        assert_eq!(options.max_message_size, Some(4096));
        assert_eq!(options.max_frame_size, Some(1024));
        assert!(options.disable_nagle);
        assert_eq!(options.headers.len(), 1);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let options = SocketOptions::new().with_max_message_size(0);
        assert!(options.validate().unwrap_err().is_config_error());
    }

    #[test]
    fn test_validate_rejects_frame_larger_than_message() {
        let options = SocketOptions::new()
            .with_max_message_size(10)
            .with_max_frame_size(20);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_to_ws_config_applies_limits() {
        let config = SocketOptions::new()
            .with_max_message_size(4096)
            .with_max_frame_size(1024)
            .to_ws_config();

        assert_eq!(config.max_message_size, Some(4096));
        assert_eq!(config.max_frame_size, Some(1024));
    }
}
