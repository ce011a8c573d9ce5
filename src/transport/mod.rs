//! Transport layer.
//!
//! A transport carries protocol frames between client and server over one
//! network mechanism. The connection coordinator picks a transport during
//! negotiation, starts it, and sends through it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  start/send   ┌────────────────────┐   frames   ┌──────────┐
//! │   Coordinator    │──────────────►│ WebSocketTransport │◄──────────►│  Server  │
//! │                  │◄──────────────│   (EventRouter)    │            │          │
//! └──────────────────┘ AsyncResult,  └────────────────────┘            └──────────┘
//!                      DataCallback,           │
//!                      state channel           ▼
//!                                      SocketConnector → Socket
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `options` | Socket size limits and upgrade headers |
//! | `query` | Target URL and query string construction |
//! | `socket` | Callback-driven socket layer over tokio-tungstenite |
//! | `websocket` | [`WebSocketTransport`] |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::connection::{ConnectionBase, ConnectionType};
use crate::error::Result;
use crate::future::AsyncResult;

// ============================================================================
// Submodules
// ============================================================================

/// Socket configuration options.
pub mod options;

/// Target URL construction.
pub mod query;

/// Socket layer and tungstenite connector.
pub mod socket;

/// WebSocket transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use options::SocketOptions;
pub use socket::{
    CloseInfo, Socket, SocketConnector, SocketEvents, SocketRequest, TungsteniteConnector,
};
pub use websocket::{TRANSPORT_NAME, WebSocketTransport, WebSocketTransportBuilder};

// ============================================================================
// Types
// ============================================================================

/// Sink for inbound frames.
///
/// Runs on the socket's event path, so it must return quickly or hand the
/// payload off to another task.
pub type DataCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Lifecycle of a transport's current socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportState {
    /// `start()` was never called.
    Uninitialized,
    /// Handshake in progress.
    Connecting,
    /// Ready to carry traffic.
    Open,
    /// The socket closed, with or without having opened.
    Closed(CloseInfo),
}

impl TransportState {
    /// Returns `true` while frames can be sent.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

// ============================================================================
// ClientTransport
// ============================================================================

/// Contract shared by every transport.
pub trait ClientTransport: Send + Sync {
    /// Identifier used in capability negotiation.
    fn name(&self) -> &'static str;

    /// Whether the server's keep-alive frames arrive over this transport.
    ///
    /// When `false` the coordinator must check liveness itself.
    fn supports_keep_alive(&self) -> bool;

    /// Opens the transport.
    ///
    /// Returns immediately. The result succeeds once the transport can carry
    /// traffic, or fails with the first error. Inbound frames go to
    /// `callback`, never to the result.
    fn start(
        &self,
        connection: &dyn ConnectionBase,
        connection_type: ConnectionType,
        callback: DataCallback,
    ) -> AsyncResult<()>;

    /// Hands `data` to the transport.
    ///
    /// The returned result completes once the frame is handed off, not when
    /// the server acknowledges it.
    ///
    /// # Errors
    ///
    /// Fails synchronously if the transport is not open.
    fn send(
        &self,
        connection: &dyn ConnectionBase,
        data: String,
        callback: DataCallback,
    ) -> Result<AsyncResult<()>>;

    /// Tears down the transport's connection.
    fn abort(&self, connection: &dyn ConnectionBase) -> AsyncResult<()>;
}

// ============================================================================
// Tests
// ============================================================================
