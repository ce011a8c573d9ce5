//! Push transport - WebSocket transport for real-time push-messaging clients.
//!
//! This library provides the transport layer a connection coordinator uses
//! to carry protocol frames over a persistent, bidirectional WebSocket.
//!
//! # Architecture
//!
//! - **Coordinator** (caller): negotiates, picks a transport, reconnects
//! - **Transport** (this crate): opens sockets, routes frames, reports state
//!
//! Key design principles:
//!
//! - Each `start()` owns a fresh socket; the previous one is closed first
//! - The start result settles exactly once, on the first of open/error
//! - Inbound frames bypass the start result and go to the data callback
//! - Closures are published on a state channel; there is no implicit reconnect
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use push_transport::{
//!     ClientTransport, Connection, ConnectionType, DataCallback, Result, WebSocketTransport,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connection = Connection::builder("http://localhost:8080/signalr")
//!         .connection_token("negotiated-token")
//!         .build()?;
//!
//!     let transport = WebSocketTransport::new();
//!     let on_data: DataCallback = Arc::new(|payload: String| println!("<- {payload}"));
//!
//!     transport
//!         .start(&connection, ConnectionType::InitialConnection, on_data.clone())
//!         .await?;
//!
//!     transport.send(&connection, "hello".into(), on_data)?.await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`connection`] | Connection state read by transports |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`future`] | One-shot [`AsyncResult`] and its [`Completer`] |
//! | [`transport`] | [`ClientTransport`] and [`WebSocketTransport`] |

// ============================================================================
// Modules
// ============================================================================

/// Connection state consumed by transports.
pub mod connection;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// One-shot async results.
pub mod future;

/// Transport contract and the WebSocket transport.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Connection types
pub use connection::{Connection, ConnectionBase, ConnectionBuilder, ConnectionType};

// Error types
pub use error::{Error, Result};

// Async results
pub use future::{AsyncResult, Completer, Completion};

// Transport types
pub use transport::{
    ClientTransport, CloseInfo, DataCallback, SocketConnector, SocketEvents, SocketOptions,
    TransportState, WebSocketTransport, WebSocketTransportBuilder,
};
