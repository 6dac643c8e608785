//! # Handler Contract
//!
//! Every event handler satisfies the same shape: it names one event, may
//! declare schemas for its positional arguments, may veto an event with a
//! guard, and handles validated arguments asynchronously.
//!
//! # Lifecycle
//!
//! Handlers are instantiated once per connection through [`BindHandler`], so
//! they may hold connection-scoped state. They are dropped with the
//! connection's listeners.
//!
//! # Static vs Dynamic Dispatch
//!
//! [`EventHandler`] uses native `async fn` for zero-cost static dispatch. The
//! factory stores handlers as [`DynEventHandler`] trait objects, implemented
//! for every `EventHandler` automatically.

use crate::{
    connection::{Connection, ConnectionRef},
    error::DispatchError,
    schema::Schema,
};
use serde_json::Value;
use std::{future::Future, pin::Pin, sync::Arc};

/// Result of a handler body.
pub type HandlerResult = Result<(), DispatchError>;

/// Boxed handler future, as produced by [`DynEventHandler::handle_dyn`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// Outcome of a guard.
#[derive(Debug)]
pub enum Guard {
    /// Continue with validation and handling.
    Proceed,
    /// Drop the event silently: no validation, no handling, no emission.
    Drop,
    /// Abort the event and route the error to the error sink.
    Reject(DispatchError),
}

impl Guard {
    /// Whether the event continues.
    pub fn proceeds(&self) -> bool {
        matches!(self, Guard::Proceed)
    }
}

impl From<bool> for Guard {
    fn from(allowed: bool) -> Self {
        if allowed { Guard::Proceed } else { Guard::Drop }
    }
}

impl<E: Into<DispatchError>> From<Result<(), E>> for Guard {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Guard::Proceed,
            Err(err) => Guard::Reject(err.into()),
        }
    }
}

/// How the positional arguments of an event are validated.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PayloadSchema {
    /// No validation; arguments pass through unchanged.
    #[default]
    Raw,
    /// Validate argument 0 only; the rest pass through unchanged.
    Single(Schema),
    /// Validate argument `i` with slot `i`. `None` slots and arguments past the
    /// last slot pass through unchanged.
    Positional(Vec<Option<Schema>>),
}

impl From<Schema> for PayloadSchema {
    fn from(schema: Schema) -> Self {
        PayloadSchema::Single(schema)
    }
}

impl From<Vec<Option<Schema>>> for PayloadSchema {
    fn from(slots: Vec<Option<Schema>>) -> Self {
        PayloadSchema::Positional(slots)
    }
}

/// The contract of a single event handler.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `EventHandler`",
    label = "missing `EventHandler` implementation",
    note = "Event handlers must name their event and implement `handle`."
)]
pub trait EventHandler: Send + Sync + 'static {
    /// Name of the handled event.
    const EVENT: &'static str;

    /// Schemas for the event arguments. Called for every event, so the schema
    /// may depend on the handler's connection-scoped state.
    fn validator(&self) -> PayloadSchema {
        PayloadSchema::Raw
    }

    /// Decide whether to process an event, before any validation.
    fn guard(&self, connection: &dyn Connection, args: &[Value]) -> Guard {
        let _ = (connection, args);
        Guard::Proceed
    }

    /// Handle validated arguments.
    fn handle(&self, args: Vec<Value>) -> impl Future<Output = HandlerResult> + Send;
}

/// Construction of a handler bound to a server handle and a connection.
pub trait BindHandler<S>: EventHandler + Sized {
    /// Build the per-connection instance.
    fn bind(server: &Arc<S>, connection: &ConnectionRef) -> Self;
}

/// Dynamic object-safe version of [`EventHandler`].
pub trait DynEventHandler: Send + Sync + 'static {
    /// Name of the handled event.
    fn event(&self) -> &'static str;

    /// See [`EventHandler::validator`].
    fn validator_dyn(&self) -> PayloadSchema;

    /// See [`EventHandler::guard`].
    fn guard_dyn(&self, connection: &dyn Connection, args: &[Value]) -> Guard;

    /// See [`EventHandler::handle`]. The returned future owns the handler.
    fn handle_dyn(self: Arc<Self>, args: Vec<Value>) -> HandlerFuture;
}

// Blanket implementation: every EventHandler is a DynEventHandler.
impl<T: EventHandler> DynEventHandler for T {
    fn event(&self) -> &'static str {
        T::EVENT
    }

    fn validator_dyn(&self) -> PayloadSchema {
        self.validator()
    }

    fn guard_dyn(&self, connection: &dyn Connection, args: &[Value]) -> Guard {
        self.guard(connection, args)
    }

    fn handle_dyn(self: Arc<Self>, args: Vec<Value>) -> HandlerFuture {
        Box::pin(async move { self.handle(args).await })
    }
}
