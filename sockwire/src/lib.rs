//! # sockwire - Event Dispatch for Socket Connections
//!
//! `sockwire` turns a flat list of typed event handlers into a per-connection
//! pipeline: connection middleware, event middleware, guards, schema
//! validation, fire-and-forget handler tasks and a closed error taxonomy with
//! a fixed client wire contract.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sockwire::prelude::*;
//!
//! struct Ping { connection: ConnectionRef }
//!
//! impl EventHandler for Ping {
//!     const EVENT: &'static str = "ping";
//!
//!     async fn handle(&self, args: Vec<Value>) -> HandlerResult {
//!         self.connection.emit("pong", args.into_iter().next().unwrap_or_default());
//!         Ok(())
//!     }
//! }
//!
//! impl BindHandler<AppState> for Ping {
//!     fn bind(_: &Arc<AppState>, connection: &ConnectionRef) -> Self {
//!         Ping { connection: connection.clone() }
//!     }
//! }
//!
//! let config = SocketConfig::load()?;
//! sockwire::logging::init(&config.logging, config.environment)?;
//!
//! let factory = HandlerFactory::builder(state)
//!     .validation(config.validation.validator_config())
//!     .register::<Ping>()
//!     .build()?;
//!
//! let server = Arc::new(
//!     SocketServer::builder(factory)
//!         .error_observer(ErrorDispatcher::new(TracingReporter, config.environment))
//!         .build(),
//! );
//! server.attach(&transport);
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub use sockwire_core::{
    BindHandler, BoxError, ClientError, ClientRedirection, Connection, ConnectionMiddleware,
    ConnectionRef, DispatchError, DynEventHandler, ERROR_EVENT, ErrorDetail, ErrorKind,
    ErrorObserver, ErrorPayload, EventHandler, EventMiddleware, ExecutionMode, Guard,
    HandlerResult, HealthReporter, INTERNAL_ERROR_MESSAGE, InboundEvent, PayloadSchema,
    REDIRECT_EVENT, RedirectPayload, RegistryError, Schema, SchemaKind, Transport, Translations,
    UnclassifiedError, ValidationEngine, ValidationFlags, ValidationResult,
};

pub use sockwire_std::{
    composer::{Admission, SocketServer, SocketServerBuilder},
    dispatcher::{ErrorDispatcher, Resolution},
    engine::DeclarativeEngine,
    factory::{HandlerFactory, HandlerFactoryBuilder},
    middleware::{EventChain, LoggingMiddleware, TracingObserver, connect_fn, event_fn, observer_fn},
    reporter::TracingReporter,
    sink::ErrorSink,
    task::{Spawner, TaskError},
    validator::{
        BAD_PAYLOAD, PayloadValidator, TranslationCatalog, Translator, ValidationContext,
        Validator, ValidatorConfig,
    },
};

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use sockwire_std::testing::*;
}

/// Prelude module - common imports for sockwire.
///
/// # Usage
///
/// ```rust,ignore
/// use sockwire::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::SocketConfig;
    pub use crate::{
        BindHandler, ClientError, ClientRedirection, Connection, ConnectionRef, DispatchError,
        ErrorDispatcher, EventHandler, Guard, HandlerFactory, HandlerResult, PayloadSchema,
        Schema, SocketServer, TracingReporter,
    };
    pub use serde_json::Value;
    pub use std::sync::Arc;
}
