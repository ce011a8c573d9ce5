//! Connection state consumed by transports.
//!
//! A transport never owns the connection. It reads the base URL and the
//! negotiated values from a [`ConnectionBase`] implementation each time it
//! starts, and never mutates them.
//!
//! # Example
//!
//! ```ignore
//! use push_transport::Connection;
//!
//! let connection = Connection::builder("http://example.com/signalr")
//!     .connection_token("AQAAANCMnd8")
//!     .connection_id("c2f3")
//!     .connection_data(r#"[{"name":"chat"}]"#)
//!     .build()?;
//!
//! assert_eq!(connection.url(), "http://example.com/signalr/");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// ConnectionType
// ============================================================================

/// Whether a `start()` is the first attempt or a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionType {
    /// First connection after negotiation.
    InitialConnection,
    /// Any later attempt on the same logical connection.
    Reconnection,
}

impl ConnectionType {
    /// Returns the URL path segment for this attempt.
    #[inline]
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::InitialConnection => "connect",
            Self::Reconnection => "reconnect",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

// ============================================================================
// ConnectionBase
// ============================================================================

/// Read-only view of a logical connection.
///
/// Implemented by the connection coordinator. Optional values return
/// `None` until negotiation provides them.
pub trait ConnectionBase: Send + Sync {
    /// Base URL of the endpoint; a trailing `/` is added if missing.
    fn url(&self) -> &str;

    /// Token returned by negotiation.
    fn connection_token(&self) -> Option<&str>;

    /// Connection id returned by negotiation.
    fn connection_id(&self) -> Option<&str>;

    /// Id of the last message received, used to resume on reconnect.
    fn message_id(&self) -> Option<&str> {
        None
    }

    /// Groups token of the last message received.
    fn groups_token(&self) -> Option<&str> {
        None
    }

    /// Serialized hub/connection data.
    fn connection_data(&self) -> Option<&str> {
        None
    }

    /// Custom query string appended verbatim, without a leading `?` or `&`.
    fn query_string(&self) -> Option<&str> {
        None
    }

    /// Extra headers sent with the upgrade request.
    fn headers(&self) -> &[(String, String)] {
        &[]
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Plain [`ConnectionBase`] implementation holding negotiated values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connection {
    url: String,
    connection_token: Option<String>,
    connection_id: Option<String>,
    message_id: Option<String>,
    groups_token: Option<String>,
    connection_data: Option<String>,
    query_string: Option<String>,
    headers: Vec<(String, String)>,
}

impl Connection {
    /// Creates a connection for `url` with no negotiated state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` does not parse.
    pub fn new(url: impl AsRef<str>) -> Result<Self> {
        Self::builder(url).build()
    }

    /// Starts a [`ConnectionBuilder`] for `url`.
    #[inline]
    #[must_use]
    pub fn builder(url: impl AsRef<str>) -> ConnectionBuilder {
        ConnectionBuilder {
            url: url.as_ref().to_string(),
            state: Self::default(),
        }
    }

    /// Records the last received message id.
    pub fn set_message_id(&mut self, message_id: impl Into<String>) {
        self.message_id = Some(message_id.into());
    }

    /// Records the last received groups token.
    pub fn set_groups_token(&mut self, groups_token: impl Into<String>) {
        self.groups_token = Some(groups_token.into());
    }
}

impl ConnectionBase for Connection {
    fn url(&self) -> &str {
        &self.url
    }

    fn connection_token(&self) -> Option<&str> {
        self.connection_token.as_deref()
    }

    fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    fn groups_token(&self) -> Option<&str> {
        self.groups_token.as_deref()
    }

    fn connection_data(&self) -> Option<&str> {
        self.connection_data.as_deref()
    }

    fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

// ============================================================================
// ConnectionBuilder
// ============================================================================

/// Builder for [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    url: String,
    state: Connection,
}

impl ConnectionBuilder {
    /// Sets the negotiated connection token.
    #[inline]
    #[must_use]
    pub fn connection_token(mut self, token: impl Into<String>) -> Self {
        self.state.connection_token = Some(token.into());
        self
    }

    /// Sets the negotiated connection id.
    #[inline]
    #[must_use]
    pub fn connection_id(mut self, id: impl Into<String>) -> Self {
        self.state.connection_id = Some(id.into());
        self
    }

    /// Sets the last received message id.
    #[inline]
    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.state.message_id = Some(id.into());
        self
    }

    /// Sets the last received groups token.
    #[inline]
    #[must_use]
    pub fn groups_token(mut self, token: impl Into<String>) -> Self {
        self.state.groups_token = Some(token.into());
        self
    }

    /// Sets the connection data payload.
    #[inline]
    #[must_use]
    pub fn connection_data(mut self, data: impl Into<String>) -> Self {
        self.state.connection_data = Some(data.into());
        self
    }

    /// Sets a custom query string, e.g. `"tenant=a&v=2"`.
    #[inline]
    #[must_use]
    pub fn query_string(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        let query = query.trim_start_matches(['?', '&']).to_string();
        self.state.query_string = Some(query);
        self
    }

    /// Adds a header to the upgrade request.
    #[inline]
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.state.headers.push((name.into(), value.into()));
        self
    }

    /// Validates the URL and builds the connection.
    ///
    /// The stored URL always ends with `/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the URL does not parse, or
    /// [`Error::Config`] if it has a query or fragment.
    pub fn build(self) -> Result<Connection> {
        let parsed = Url::parse(&self.url)?;
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(Error::config(format!(
                "Connection URL must not carry a query or fragment: {}",
                self.url
            )));
        }

        let mut url = parsed.to_string();
        if !url.ends_with('/') {
            url.push('/');
        }

        Ok(Connection { url, ..self.state })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segment() {
        assert_eq!(ConnectionType::InitialConnection.path_segment(), "connect");
        assert_eq!(ConnectionType::Reconnection.path_segment(), "reconnect");
        assert_eq!(ConnectionType::Reconnection.to_string(), "reconnect");
    }

    #[test]
    fn test_url_gets_trailing_slash() {
        let conn = Connection::new("http://host/app").unwrap();
        assert_eq!(conn.url(), "http://host/app/");

        let conn = Connection::new("https://host/app/").unwrap();
        assert_eq!(conn.url(), "https://host/app/");
    }

    #[test]
    fn test_builder_sets_state() {
        let conn = Connection::builder("http://host/app")
            .connection_token("tok")
            .connection_id("id-1")
            .message_id("m-1")
            .groups_token("g-1")
            .connection_data("[]")
            .query_string("?a=1")
            .header("X-Client", "rust")
            .build()
            .unwrap();

        assert_eq!(conn.connection_token(), Some("tok"));
        assert_eq!(conn.connection_id(), Some("id-1"));
        assert_eq!(conn.message_id(), Some("m-1"));
        assert_eq!(conn.groups_token(), Some("g-1"));
        assert_eq!(conn.connection_data(), Some("[]"));
        assert_eq!(conn.query_string(), Some("a=1"));
        assert_eq!(conn.headers(), &[("X-Client".to_string(), "rust".to_string())]);
    }

    #[test]
    fn test_invalid_url() {
        let err = Connection::new("not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_url_with_query_rejected() {
        let err = Connection::new("http://host/app?x=1").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_setters_update_resume_state() {
        let mut conn = Connection::new("http://host/").unwrap();
        assert_eq!(conn.message_id(), None);

        conn.set_message_id("d-5");
        conn.set_groups_token("gt");
        assert_eq!(conn.message_id(), Some("d-5"));
        assert_eq!(conn.groups_token(), Some("gt"));
    }
}
