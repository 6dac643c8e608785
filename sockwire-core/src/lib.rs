//! # sockwire-core
//!
//! Core traits and data types for the sockwire event dispatch pipeline.
//!
//! This crate has minimal dependencies and is what transports, validation
//! engines and handler crates depend on. Standard implementations live in
//! `sockwire-std`.
//!
//! # Pipeline
//!
//! ```text
//! accept ─▶ ConnectionMiddleware* ─▶ attach ErrorObserver* ─▶ bind handlers
//! event  ─▶ EventMiddleware* ─▶ guard ─▶ validate ─▶ spawn handle
//!                 │                │         │            │
//!                 └────────────────┴─────────┴────────────┴──▶ error sink
//! ```
//!
//! - [`Connection`] / [`Transport`] - the boundary to the transport
//! - [`EventHandler`] - the per-event handler contract
//! - [`Schema`] / [`ValidationEngine`] - payload validation
//! - [`DispatchError`] - the closed error taxonomy
//! - [`ErrorPayload`] / [`RedirectPayload`] - the client wire contract

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod connection;
mod error;
mod handler;
mod health;
mod middleware;
mod schema;
mod validation;
mod wire;

// Re-exports
pub use connection::{
    Connection, ConnectionListener, ConnectionRef, EventListener, Transport,
    TransportErrorListener,
};
pub use error::{
    BoxError, ClientError, ClientRedirection, DispatchError, ErrorKind, RegistryError,
    UnclassifiedError,
};
pub use handler::{
    BindHandler, DynEventHandler, EventHandler, Guard, HandlerFuture, HandlerResult,
    PayloadSchema,
};
pub use health::{ExecutionMode, HealthReporter};
pub use middleware::{ConnectionMiddleware, ErrorObserver, EventMiddleware, InboundEvent};
pub use schema::{Schema, SchemaKind};
pub use validation::{
    DetailContext, ErrorDetail, PathSegment, Translations, ValidationEngine, ValidationFlags,
    ValidationResult, join_messages,
};
pub use wire::{
    ERROR_EVENT, ErrorPayload, INTERNAL_ERROR_MESSAGE, REDIRECT_EVENT, RedirectPayload,
};
