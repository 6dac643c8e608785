//! Per-connection error sink.

use sockwire_core::{ConnectionRef, DispatchError, ErrorObserver};
use std::{fmt, sync::Arc};

/// Delivers every error raised for one connection to the error observers,
/// in registration order.
///
/// Both the synchronous dispatch path and spawned handler tasks raise into
/// the same sink, so no error escapes the observers.
#[derive(Clone)]
pub struct ErrorSink {
    connection: ConnectionRef,
    observers: Arc<[Arc<dyn ErrorObserver>]>,
}

impl ErrorSink {
    /// Sink for `connection`.
    pub fn new(connection: ConnectionRef, observers: Arc<[Arc<dyn ErrorObserver>]>) -> Self {
        Self {
            connection,
            observers,
        }
    }

    /// The connection errors are raised for.
    pub fn connection(&self) -> &ConnectionRef {
        &self.connection
    }

    /// Number of observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Hand `error` to every observer.
    pub fn raise(&self, error: DispatchError) {
        tracing::debug!(
            connection = %self.connection.id(),
            kind = ?error.kind(),
            %error,
            "error raised"
        );
        for observer in self.observers.iter() {
            observer.on_error(&*self.connection, &error);
        }
    }

    /// Route transport-level errors of the connection into this sink.
    pub fn attach(&self) {
        let sink = self.clone();
        self.connection.on_error(Box::new(move |error| {
            sink.raise(DispatchError::from_boxed(error));
        }));
    }
}

impl fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSink")
            .field("connection", &self.connection.id())
            .field("observers", &self.observers.len())
            .finish()
    }
}
