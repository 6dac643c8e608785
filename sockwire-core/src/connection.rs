//! # Transport Boundary
//!
//! sockwire never owns a connection. The transport accepts connections, frames
//! and multiplexes events, and exposes each connection through [`Connection`].
//! The pipeline only attaches behavior to a connection's lifecycle: named
//! events, transport errors, and disconnection.
//!
//! Implementations must be cheap to share: the pipeline holds connections as
//! [`ConnectionRef`] (`Arc<dyn Connection>`) inside listeners and handler tasks.
//! Listeners hold the connection, so transports must drop a connection's
//! listeners once it closes.

use crate::error::BoxError;
use serde_json::Value;
use std::sync::Arc;

/// Shared handle to a connection.
pub type ConnectionRef = Arc<dyn Connection>;

/// Listener invoked with the positional arguments of one inbound event.
pub type EventListener = Box<dyn Fn(Vec<Value>) + Send + Sync + 'static>;

/// Listener invoked with an error raised by the transport for a connection.
pub type TransportErrorListener = Box<dyn Fn(BoxError) + Send + Sync + 'static>;

/// Listener invoked once per accepted connection.
pub type ConnectionListener = Box<dyn Fn(ConnectionRef) + Send + Sync + 'static>;

/// A bidirectional, event-based channel with a stable session id.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a sockwire `Connection`",
    label = "missing `Connection` implementation",
    note = "Adapt your transport's socket type by implementing `Connection`."
)]
pub trait Connection: Send + Sync + 'static {
    /// Stable session id.
    fn id(&self) -> &str;

    /// Send an event with a payload to the client.
    fn emit(&self, event: &str, payload: Value);

    /// Force-close the connection.
    fn disconnect(&self);

    /// Whether the connection is still open.
    fn connected(&self) -> bool;

    /// Subscribe a listener to a named inbound event.
    fn on(&self, event: &str, listener: EventListener);

    /// Subscribe a listener to errors raised by the transport, including
    /// rejections of asynchronous work that belongs to this connection.
    fn on_error(&self, listener: TransportErrorListener);

    /// Language negotiated at handshake, if any.
    fn locale(&self) -> Option<&str> {
        None
    }
}

/// The accepting side of a transport.
pub trait Transport: Send + Sync {
    /// Register a listener for newly accepted connections.
    fn on_connection(&self, listener: ConnectionListener);
}
