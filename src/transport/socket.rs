//! Callback-driven socket layer.
//!
//! A [`SocketConnector`] opens a socket for a URL and reports everything
//! that happens on it through a [`SocketEvents`] sink. Callers get back a
//! [`Socket`] handle for writing frames and closing.
//!
//! # Event Order
//!
//! For each socket the sink sees:
//!
//! ```text
//! on_error? ──────────────────────────────► on_close      (handshake failed)
//! on_open ─► on_message* ─► on_error? ────► on_close      (after open)
//! ```
//!
//! `on_close` is always the last event. Events run on the socket's own
//! tokio task and must not block.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::options::SocketOptions;

// ============================================================================
// Constants
// ============================================================================

/// Close code for a normal, requested closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code for a connection lost without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

// ============================================================================
// CloseInfo
// ============================================================================

/// Details of a socket closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket close code.
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
    /// `true` if the peer or the network ended the connection.
    pub remote: bool,
}

impl CloseInfo {
    /// Closure requested on this side.
    #[must_use]
    pub fn local(reason: impl Into<String>) -> Self {
        Self {
            code: CLOSE_NORMAL,
            reason: reason.into(),
            remote: false,
        }
    }

    /// Connection lost without a close handshake.
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: CLOSE_ABNORMAL,
            reason: reason.into(),
            remote: true,
        }
    }

    fn from_frame(frame: Option<CloseFrame>) -> Self {
        match frame {
            Some(frame) => Self {
                code: u16::from(frame.code),
                reason: frame.reason.as_str().to_owned(),
                remote: true,
            },
            None => Self {
                code: CLOSE_NORMAL,
                reason: String::new(),
                remote: true,
            },
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Receiver of socket lifecycle events.
pub trait SocketEvents: Send + Sync {
    /// The handshake succeeded.
    ///
    /// Returns `false` if nobody wants the socket any more, in which case
    /// the socket closes itself.
    fn on_open(&self) -> bool;

    /// A text frame arrived.
    fn on_message(&self, payload: String);

    /// The handshake or the live connection failed.
    fn on_error(&self, error: Error);

    /// The socket is gone. Always the final event.
    fn on_close(&self, close: CloseInfo);
}

/// Handle to an open or opening socket.
///
/// Dropping the handle closes the socket.
pub trait Socket: Send + Sync {
    /// Queues a text frame for writing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the socket task has ended.
    fn send_text(&self, data: String) -> Result<()>;

    /// Starts a close handshake. Idempotent.
    fn close(&self);
}

/// Everything needed to open one socket.
#[derive(Debug, Clone)]
pub struct SocketRequest {
    /// Target `ws://` or `wss://` URL.
    pub url: Url,
    /// Upgrade request headers.
    pub headers: Vec<(String, String)>,
}

/// Opens sockets.
pub trait SocketConnector: Send + Sync {
    /// Starts connecting and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be issued at all. Failures
    /// of the connection attempt itself go to `events`.
    fn connect(
        &self,
        request: SocketRequest,
        events: Arc<dyn SocketEvents>,
    ) -> Result<Box<dyn Socket>>;
}

// ============================================================================
// TungsteniteConnector
// ============================================================================

/// [`SocketConnector`] backed by `tokio-tungstenite`.
///
/// Each socket runs on its own task on the caller's tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector {
    options: SocketOptions,
}

impl TungsteniteConnector {
    /// Creates a connector applying `options` to every socket.
    #[inline]
    #[must_use]
    pub fn new(options: SocketOptions) -> Self {
        Self { options }
    }

    fn client_request(&self, request: &SocketRequest) -> Result<Request> {
        let mut client_request = request.url.as_str().into_client_request()?;

        let headers = self.options.headers.iter().chain(request.headers.iter());
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::config(format!("Invalid header name {name:?}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| Error::config(format!("Invalid value for header {name}: {e}")))?;
            client_request
                .headers_mut()
                .append(header_name, header_value);
        }

        Ok(client_request)
    }
}

impl SocketConnector for TungsteniteConnector {
    fn connect(
        &self,
        request: SocketRequest,
        events: Arc<dyn SocketEvents>,
    ) -> Result<Box<dyn Socket>> {
        let runtime = Handle::try_current()
            .map_err(|_| Error::config("WebSocket transport must be started inside a Tokio runtime"))?;

        let client_request = self.client_request(&request)?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        runtime.spawn(run_socket(
            client_request,
            self.options.clone(),
            command_rx,
            events,
        ));

        debug!(url = %request.url, "WebSocket connect initiated");

        Ok(Box::new(TungsteniteSocket { command_tx }))
    }
}

// ============================================================================
// TungsteniteSocket
// ============================================================================

/// Commands for the socket task.
enum SocketCommand {
    /// Write a text frame.
    Send(String),
    /// Close the socket.
    Close,
}

/// Handle to a socket task spawned by [`TungsteniteConnector`].
struct TungsteniteSocket {
    command_tx: mpsc::UnboundedSender<SocketCommand>,
}

impl Socket for TungsteniteSocket {
    fn send_text(&self, data: String) -> Result<()> {
        self.command_tx
            .send(SocketCommand::Send(data))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&self) {
        let _ = self.command_tx.send(SocketCommand::Close);
    }
}

// ============================================================================
// Socket Task
// ============================================================================

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Drives one socket from handshake to closure.
async fn run_socket(
    request: Request,
    options: SocketOptions,
    mut command_rx: mpsc::UnboundedReceiver<SocketCommand>,
    events: Arc<dyn SocketEvents>,
) {
    let connect = connect_async_with_config(
        request,
        Some(options.to_ws_config()),
        options.disable_nagle,
    );

    let ws_stream = tokio::select! {
        result = connect => match result {
            Ok((stream, response)) => {
                debug!(status = %response.status(), "WebSocket handshake completed");
                stream
            }
            Err(e) => {
                let reason = e.to_string();
                events.on_error(Error::WebSocket(e));
                events.on_close(CloseInfo::abnormal(reason));
                return;
            }
        },

        () = wait_for_close(&mut command_rx) => {
            debug!("Socket closed before handshake completed");
            events.on_close(CloseInfo::local("closed before open"));
            return;
        }
    };

    if !events.on_open() {
        let mut ws_stream = ws_stream;
        let _ = ws_stream.close(None).await;
        events.on_close(CloseInfo::local("start abandoned"));
        return;
    }

    let close = run_event_loop(ws_stream, command_rx, &*events).await;
    debug!(code = close.code, remote = close.remote, "WebSocket closed");
    events.on_close(close);
}

/// Waits for a close request during the handshake.
///
/// Frames cannot be written before open and are dropped.
async fn wait_for_close(command_rx: &mut mpsc::UnboundedReceiver<SocketCommand>) {
    loop {
        match command_rx.recv().await {
            Some(SocketCommand::Send(text)) => {
                warn!(len = text.len(), "Dropping frame sent before open");
            }
            Some(SocketCommand::Close) | None => return,
        }
    }
}

/// Pumps frames until either side closes.
async fn run_event_loop(
    ws_stream: Stream,
    mut command_rx: mpsc::UnboundedReceiver<SocketCommand>,
    events: &dyn SocketEvents,
) -> CloseInfo {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            // Incoming frames from the server
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "Frame received");
                        events.on_message(text.as_str().to_owned());
                    }

                    Some(Ok(Message::Close(frame))) => {
                        return CloseInfo::from_frame(frame);
                    }

                    Some(Err(e)) => {
                        let reason = e.to_string();
                        events.on_error(Error::WebSocket(e));
                        return CloseInfo::abnormal(reason);
                    }

                    None => {
                        return CloseInfo::abnormal("stream ended");
                    }

                    // Ignore Binary, Ping, Pong
                    Some(Ok(_)) => {}
                }
            }

            // Commands from the transport
            command = command_rx.recv() => {
                match command {
                    Some(SocketCommand::Send(text)) => {
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            warn!(error = %e, "Failed to write frame");
                            let reason = e.to_string();
                            events.on_error(Error::WebSocket(e));
                            return CloseInfo::abnormal(reason);
                        }
                        trace!("Frame sent");
                    }

                    Some(SocketCommand::Close) | None => {
                        let _ = ws_write.close().await;
                        return CloseInfo::local("");
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
