//! # Middleware Composer
//!
//! [`SocketServer`] wires the three middleware lists around a
//! [`HandlerFactory`] for every accepted connection:
//!
//! 1. an [`ErrorSink`] over the error observers is created
//! 2. connection middleware runs in order; the first rejection is raised into
//!    the sink and the connection is closed without binding handlers
//! 3. transport errors of the connection are routed into the sink
//! 4. the factory binds every handler behind the event middleware chain
//!
//! Without any error observer, an [`ErrorDispatcher`] reporting through
//! [`TracingReporter`] in production mode is installed.

use crate::{
    dispatcher::ErrorDispatcher,
    factory::HandlerFactory,
    middleware::EventChain,
    reporter::TracingReporter,
    sink::ErrorSink,
};
use sockwire_core::{
    ConnectionMiddleware, ConnectionRef, ErrorKind, ErrorObserver, EventMiddleware, Transport,
};
use std::{fmt, sync::Arc};

/// Outcome of [`SocketServer::accept`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Handlers were bound.
    Accepted {
        /// Number of bound handlers.
        handlers: usize,
    },
    /// A connection middleware rejected the connection.
    Rejected(ErrorKind),
}

impl Admission {
    /// Whether handlers were bound.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted { .. })
    }
}

/// Builder for [`SocketServer`].
pub struct SocketServerBuilder<S> {
    factory: HandlerFactory<S>,
    connection: Vec<Arc<dyn ConnectionMiddleware>>,
    events: Vec<Arc<dyn EventMiddleware>>,
    observers: Vec<Arc<dyn ErrorObserver>>,
}

impl<S: Send + Sync + 'static> SocketServerBuilder<S> {
    /// Append connection middleware.
    pub fn connection_middleware(mut self, middleware: impl ConnectionMiddleware) -> Self {
        self.connection.push(Arc::new(middleware));
        self
    }

    /// Append event middleware.
    pub fn event_middleware(mut self, middleware: impl EventMiddleware) -> Self {
        self.events.push(Arc::new(middleware));
        self
    }

    /// Append an error observer.
    pub fn error_observer(mut self, observer: impl ErrorObserver) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Append an already shared error observer.
    pub fn shared_error_observer(mut self, observer: Arc<dyn ErrorObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Finish composition.
    pub fn build(mut self) -> SocketServer<S> {
        if self.observers.is_empty() {
            self.observers
                .push(Arc::new(ErrorDispatcher::new(TracingReporter, false)));
        }
        SocketServer {
            factory: self.factory,
            connection: self.connection.into(),
            events: EventChain::new(self.events),
            observers: self.observers.into(),
        }
    }
}

/// A composed pipeline, ready to accept connections.
pub struct SocketServer<S> {
    factory: HandlerFactory<S>,
    connection: Arc<[Arc<dyn ConnectionMiddleware>]>,
    events: EventChain,
    observers: Arc<[Arc<dyn ErrorObserver>]>,
}

impl<S: Send + Sync + 'static> SocketServer<S> {
    /// Compose around `factory`.
    pub fn builder(factory: HandlerFactory<S>) -> SocketServerBuilder<S> {
        SocketServerBuilder {
            factory,
            connection: Vec::new(),
            events: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// The handler factory.
    pub fn factory(&self) -> &HandlerFactory<S> {
        &self.factory
    }

    /// Run the connection pipeline for a newly accepted connection.
    pub fn accept(&self, connection: ConnectionRef) -> Admission {
        let sink = ErrorSink::new(Arc::clone(&connection), Arc::clone(&self.observers));

        for middleware in self.connection.iter() {
            if let Err(error) = middleware.on_connect(&*connection) {
                let kind = error.kind();
                tracing::debug!(connection = %connection.id(), ?kind, "connection rejected");
                sink.raise(error);
                if connection.connected() {
                    connection.disconnect();
                }
                return Admission::Rejected(kind);
            }
        }

        sink.attach();
        let handlers = self.factory.bind(&connection, &self.events, &sink);
        Admission::Accepted { handlers }
    }

    /// Accept every connection of `transport`.
    pub fn attach<T: Transport + ?Sized>(self: Arc<Self>, transport: &T) {
        tracing::debug!(events = ?self.factory.events().collect::<Vec<_>>(), "attached to transport");
        transport.on_connection(Box::new(move |connection: ConnectionRef| {
            self.accept(connection);
        }));
    }
}

impl<S> fmt::Debug for SocketServer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketServer")
            .field("factory", &self.factory)
            .field("connection_middleware", &self.connection.len())
            .field("event_middleware", &self.events.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}
