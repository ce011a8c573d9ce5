//! Target URL construction for socket transports.
//!
//! # Format
//!
//! ```text
//! {base url}/{connect|reconnect}?transport={name}&connectionToken={token}
//!     &connectionId={id}[&messageId=..][&groupsToken=..][&connectionData=..][&{custom}]
//! ```
//!
//! Values are percent-encoded, the custom query string is appended as-is.
//! The scheme is rewritten `http` → `ws` and `https` → `wss`.

// ============================================================================
// Imports
// ============================================================================

use url::Url;
use urlencoding::encode;

use crate::connection::{ConnectionBase, ConnectionType};
use crate::error::{Error, Result};

// ============================================================================
// Query String
// ============================================================================

/// Builds the receive query string for `transport_name`, including the `?`.
#[must_use]
pub fn receive_query_string(transport_name: &str, connection: &dyn ConnectionBase) -> String {
    let mut query = format!("?transport={}", encode(transport_name));

    if let Some(token) = connection.connection_token() {
        push_pair(&mut query, "connectionToken", token);
    }
    if let Some(id) = connection.connection_id() {
        push_pair(&mut query, "connectionId", id);
    }

    let optional = [
        ("messageId", connection.message_id()),
        ("groupsToken", connection.groups_token()),
        ("connectionData", connection.connection_data()),
    ];
    for (key, value) in optional {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            push_pair(&mut query, key, value);
        }
    }

    if let Some(custom) = connection.query_string().filter(|q| !q.is_empty()) {
        query.push('&');
        query.push_str(custom);
    }

    query
}

fn push_pair(query: &mut String, key: &str, value: &str) {
    query.push('&');
    query.push_str(key);
    query.push('=');
    query.push_str(&encode(value));
}

// ============================================================================
// Socket URL
// ============================================================================

/// Builds the socket URL for a `start()` of the given type.
///
/// # Errors
///
/// - [`Error::InvalidUrl`] if the assembled URL does not parse
/// - [`Error::Config`] if the base scheme is not http(s) or ws(s)
pub fn socket_url(
    transport_name: &str,
    connection: &dyn ConnectionBase,
    connection_type: ConnectionType,
) -> Result<Url> {
    let base = connection.url();
    let separator = if base.ends_with('/') { "" } else { "/" };

    let raw = format!(
        "{base}{separator}{}{}",
        connection_type.path_segment(),
        receive_query_string(transport_name, connection)
    );

    let mut url = Url::parse(&raw)?;
    to_socket_scheme(&mut url)?;
    Ok(url)
}

/// Rewrites an HTTP scheme to its WebSocket counterpart.
///
/// `ws` and `wss` are left unchanged.
///
/// # Errors
///
/// Returns [`Error::Config`] for any other scheme.
pub fn to_socket_scheme(url: &mut Url) -> Result<()> {
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" | "wss" => return Ok(()),
        other => {
            return Err(Error::config(format!(
                "Unsupported URL scheme for WebSocket transport: {other}"
            )));
        }
    };

    url.set_scheme(scheme)
        .map_err(|()| Error::config(format!("Cannot switch {url} to {scheme}")))
}

// ============================================================================
// Tests
// ============================================================================
