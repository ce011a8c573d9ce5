//! WebSocket implementation of [`ClientTransport`].
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──start──► Connecting ──open──► Open ──close──► Closed
//!                              │                                  ▲
//!                              └────────────error/close───────────┘
//! ```
//!
//! Every `start()` opens a fresh socket tagged with a new generation number.
//! The previous socket is closed first, and events it still emits are
//! ignored for lifecycle purposes. The state of the current socket is
//! published through [`WebSocketTransport::subscribe`].
//!
//! A close after a successful open is only reported on that channel. The
//! transport never reconnects on its own.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::connection::{ConnectionBase, ConnectionType};
use crate::error::{Error, Result};
use crate::future::{self, AsyncResult, Completer, Completion};

use super::options::SocketOptions;
use super::query::socket_url;
use super::socket::{
    CloseInfo, Socket, SocketConnector, SocketEvents, SocketRequest, TungsteniteConnector,
};
use super::{ClientTransport, DataCallback, TransportState};

// ============================================================================
// Constants
// ============================================================================

/// Name used in transport negotiation.
pub const TRANSPORT_NAME: &str = "webSockets";

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Transport carrying text frames over a WebSocket.
///
/// # Thread Safety
///
/// `WebSocketTransport` is `Send + Sync`. `start()` and `send()` never block
/// on the network; socket events are handled on the socket's own task.
pub struct WebSocketTransport {
    /// Opens the sockets.
    connector: Arc<dyn SocketConnector>,
    /// The current socket, if any.
    current: Mutex<Option<SocketSlot>>,
    /// Generation of the most recent `start()`.
    generation: Arc<AtomicU64>,
    /// Lifecycle of the current socket.
    state_tx: Arc<watch::Sender<TransportState>>,
}

/// The socket owned by one `start()`.
struct SocketSlot {
    socket: Box<dyn Socket>,
    router: Arc<EventRouter>,
}

impl fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("generation", &self.generation())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketTransport {
    /// Creates a transport with default socket options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(Arc::new(TungsteniteConnector::default()))
    }

    /// Creates a transport that opens sockets through `connector`.
    #[must_use]
    pub fn with_connector(connector: Arc<dyn SocketConnector>) -> Self {
        let (state_tx, _) = watch::channel(TransportState::Uninitialized);
        Self {
            connector,
            current: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
            state_tx: Arc::new(state_tx),
        }
    }

    /// Starts a [`WebSocketTransportBuilder`].
    #[inline]
    #[must_use]
    pub fn builder() -> WebSocketTransportBuilder {
        WebSocketTransportBuilder::new()
    }

    /// Returns the lifecycle state of the current socket.
    #[must_use]
    pub fn state(&self) -> TransportState {
        self.state_tx.borrow().clone()
    }

    /// Subscribes to lifecycle changes of the current socket.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TransportState> {
        self.state_tx.subscribe()
    }

    /// Returns how many times `start()` has been called.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Takes the current socket out and closes it.
    ///
    /// A start still pending on that socket fails with `error`.
    fn release_current(&self, error: Error) {
        let previous = self.current.lock().take();
        if let Some(slot) = previous {
            debug!(
                generation = slot.router.generation,
                reason = %error,
                "Closing previous socket"
            );
            slot.router.retire(error);
            slot.socket.close();
        }
    }
}

impl ClientTransport for WebSocketTransport {
    fn name(&self) -> &'static str {
        TRANSPORT_NAME
    }

    fn supports_keep_alive(&self) -> bool {
        true
    }

    fn start(
        &self,
        connection: &dyn ConnectionBase,
        connection_type: ConnectionType,
        callback: DataCallback,
    ) -> AsyncResult<()> {
        info!(%connection_type, "Starting WebSocket transport");

        let url = match socket_url(TRANSPORT_NAME, connection, connection_type) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Cannot build WebSocket URL");
                return AsyncResult::completed(Err(e));
            }
        };

        self.release_current(Error::Superseded);

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let (completer, result) = future::pair();
        let router = Arc::new(EventRouter {
            generation,
            current: Arc::clone(&self.generation),
            completer,
            callback,
            state: Mutex::new(TransportState::Connecting),
            opened: AtomicBool::new(false),
            state_tx: Arc::clone(&self.state_tx),
        });
        self.state_tx.send_replace(TransportState::Connecting);

        let request = SocketRequest {
            url: url.clone(),
            headers: connection.headers().to_vec(),
        };

        let socket = match self.connector.connect(request, router.clone()) {
            Ok(socket) => socket,
            Err(e) => {
                warn!(generation, error = %e, "WebSocket connect failed");
                let reason = e.to_string();
                router.on_error(e);
                router.on_close(CloseInfo::abnormal(reason));
                return result;
            }
        };

        let displaced = {
            let mut current = self.current.lock();
            if self.generation.load(Ordering::Acquire) == generation {
                // A concurrent start() may have stored its socket after our release.
                current.replace(SocketSlot { socket, router })
            } else {
                // A newer start() already won.
                Some(SocketSlot { socket, router })
            }
        };
        if let Some(slot) = displaced {
            debug!(
                generation = slot.router.generation,
                "Closing socket displaced by concurrent start"
            );
            slot.router.retire(Error::Superseded);
            slot.socket.close();
        }

        info!(generation, %url, "WebSocket connecting");
        result
    }

    fn send(
        &self,
        _connection: &dyn ConnectionBase,
        data: String,
        _callback: DataCallback,
    ) -> Result<AsyncResult<()>> {
        let current = self.current.lock();
        let Some(slot) = current.as_ref() else {
            return Err(Error::config(
                "Must call start in advance in order to initialize the transport",
            ));
        };

        match slot.router.state() {
            TransportState::Open => {}
            TransportState::Closed(_) if slot.router.has_opened() => {
                return Err(Error::ConnectionClosed);
            }
            _ => {
                return Err(Error::config(
                    "WebSocket never opened; start must succeed before send",
                ));
            }
        }

        trace!(generation = slot.router.generation, len = data.len(), "Sending frame");
        slot.socket.send_text(data)?;

        Ok(AsyncResult::completed(Ok(())))
    }

    fn abort(&self, _connection: &dyn ConnectionBase) -> AsyncResult<()> {
        info!("Aborting WebSocket transport");
        self.release_current(Error::ConnectionClosed);
        AsyncResult::completed(Ok(()))
    }
}

// ============================================================================
// EventRouter
// ============================================================================

/// Socket event sink for one `start()`.
///
/// Settles the start result on the first of open/error, forwards frames to
/// the data callback, and publishes lifecycle changes while its generation
/// is current.
struct EventRouter {
    generation: u64,
    current: Arc<AtomicU64>,
    completer: Completer<()>,
    callback: DataCallback,
    state: Mutex<TransportState>,
    /// Set once the handshake succeeded and the start was delivered.
    opened: AtomicBool,
    state_tx: Arc<watch::Sender<TransportState>>,
}

impl EventRouter {
    fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.generation
    }

    fn state(&self) -> TransportState {
        self.state.lock().clone()
    }

    fn has_opened(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }

    fn publish(&self, state: TransportState) {
        if self.is_current() {
            self.state_tx.send_replace(state);
        }
    }

    /// Fails a still-pending start because its socket is being discarded.
    fn retire(&self, error: Error) {
        let message = error.to_string();
        if self.completer.complete(Err(error)).settled() {
            debug!(generation = self.generation, reason = %message, "Pending start retired");
        }
    }
}

impl SocketEvents for EventRouter {
    fn on_open(&self) -> bool {
        // Held across completion so a duplicate open sees `Open`.
        let mut state = self.state.lock();
        if matches!(*state, TransportState::Open) {
            return true;
        }

        match self.completer.complete(Ok(())) {
            Completion::Delivered => {
                self.opened.store(true, Ordering::Release);
                *state = TransportState::Open;
                drop(state);
                self.publish(TransportState::Open);
                info!(generation = self.generation, "WebSocket opened");
                true
            }
            Completion::Abandoned => {
                warn!(
                    generation = self.generation,
                    "Start result dropped before open, closing socket"
                );
                false
            }
            Completion::AlreadyCompleted => {
                debug!(
                    generation = self.generation,
                    "Socket opened after its start was settled, closing"
                );
                false
            }
        }
    }

    fn on_message(&self, payload: String) {
        if !self.is_current() {
            debug!(generation = self.generation, "Dropping frame from stale socket");
            return;
        }
        (self.callback)(payload);
    }

    fn on_error(&self, error: Error) {
        let message = error.to_string();
        match self.completer.complete(Err(error)) {
            Completion::Delivered => {
                warn!(generation = self.generation, error = %message, "WebSocket failed before open");
            }
            Completion::Abandoned => {
                debug!(generation = self.generation, error = %message, "WebSocket failed after start was dropped");
            }
            Completion::AlreadyCompleted => {
                warn!(generation = self.generation, error = %message, "WebSocket error");
            }
        }
    }

    fn on_close(&self, close: CloseInfo) {
        debug!(
            generation = self.generation,
            code = close.code,
            reason = %close.reason,
            remote = close.remote,
            "WebSocket closed"
        );
        let state = TransportState::Closed(close);
        *self.state.lock() = state.clone();
        self.publish(state);
    }
}

// ============================================================================
// WebSocketTransportBuilder
// ============================================================================

/// Builder for [`WebSocketTransport`].
#[derive(Default)]
pub struct WebSocketTransportBuilder {
    options: SocketOptions,
    connector: Option<Arc<dyn SocketConnector>>,
}

impl fmt::Debug for WebSocketTransportBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketTransportBuilder")
            .field("options", &self.options)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

impl WebSocketTransportBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the socket options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: SocketOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the tungstenite connector.
    ///
    /// Options are ignored when a custom connector is set.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn SocketConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Builds the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are inconsistent.
    pub fn build(self) -> Result<WebSocketTransport> {
        self.options.validate()?;

        let connector = match self.connector {
            Some(connector) => connector,
            None => Arc::new(TungsteniteConnector::new(self.options)),
        };

        Ok(WebSocketTransport::with_connector(connector))
    }
}

// ============================================================================
// Tests
// ============================================================================
