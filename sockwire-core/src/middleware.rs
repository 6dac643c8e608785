//! Connection-level middleware contracts.
//!
//! Three independently ordered lists are applied to each connection:
//!
//! - [`ConnectionMiddleware`] runs once when a connection is accepted and can
//!   reject it before any handler is bound.
//! - [`EventMiddleware`] runs for every inbound event before dispatch and can
//!   reject (or rewrite) that event only.
//! - [`ErrorObserver`] receives every error raised for the connection.

use crate::{connection::Connection, error::DispatchError};
use serde_json::Value;

/// An inbound event as seen by event middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    name: String,
    args: Vec<Value>,
}

impl InboundEvent {
    /// Create an inbound event.
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Positional arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Mutable positional arguments.
    pub fn args_mut(&mut self) -> &mut Vec<Value> {
        &mut self.args
    }

    /// Take the arguments.
    pub fn into_args(self) -> Vec<Value> {
        self.args
    }
}

/// Runs once per accepted connection, in registration order.
pub trait ConnectionMiddleware: Send + Sync + 'static {
    /// `Err` rejects the connection; no handler is bound.
    fn on_connect(&self, connection: &dyn Connection) -> Result<(), DispatchError>;
}

/// Runs once per inbound event, before dispatch, in registration order.
///
/// Only events with a registered handler reach the chain. [`Connection`]
/// has no catch-all subscription, so other events are never seen here.
pub trait EventMiddleware: Send + Sync + 'static {
    /// `Err` aborts processing of this event only.
    fn on_event(
        &self,
        connection: &dyn Connection,
        event: &mut InboundEvent,
    ) -> Result<(), DispatchError>;
}

/// Receives every error raised for a connection.
pub trait ErrorObserver: Send + Sync + 'static {
    /// Observe (and usually translate) one error.
    fn on_error(&self, connection: &dyn Connection, error: &DispatchError);
}
