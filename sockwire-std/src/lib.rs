//! # sockwire-std
//!
//! Standard implementations for the sockwire event dispatch pipeline.
//!
//! This crate provides:
//! - **Handler binding**: [`HandlerFactory`](factory::HandlerFactory)
//! - **Composition**: [`SocketServer`](composer::SocketServer)
//! - **Error classification**: [`ErrorDispatcher`](dispatcher::ErrorDispatcher)
//! - **Validation**: [`DeclarativeEngine`](engine::DeclarativeEngine),
//!   [`Validator`](validator::Validator), [`Translator`](validator::Translator)
//! - **Standard middleware**: logging, closures, tracing observer
//! - **Testing**: in-memory connection, transport and recorders

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use sockwire_core;

// Modules
pub mod composer;
pub mod dispatcher;
pub mod engine;
pub mod factory;
pub mod middleware;
pub mod reporter;
pub mod sink;
pub mod task;
pub mod testing;
pub mod validator;
