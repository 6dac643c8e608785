//! Standard middleware and observers.
//!
//! - [`EventChain`]: the ordered event middleware applied before dispatch
//! - [`connect_fn`] / [`event_fn`] / [`observer_fn`]: closures as middleware
//! - [`LoggingMiddleware`]: logs accepted connections and inbound events
//! - [`TracingObserver`]: logs every raised error

use sockwire_core::{
    Connection, ConnectionMiddleware, DispatchError, ErrorKind, ErrorObserver, EventMiddleware,
    InboundEvent,
};
use std::{fmt, sync::Arc};

/// Ordered event middleware shared by every handler of a connection.
#[derive(Clone)]
pub struct EventChain {
    middleware: Arc<[Arc<dyn EventMiddleware>]>,
}

impl EventChain {
    /// Chain running `middleware` in order.
    pub fn new(middleware: Vec<Arc<dyn EventMiddleware>>) -> Self {
        Self {
            middleware: middleware.into(),
        }
    }

    /// Run the chain. Stops at the first rejection.
    pub fn run(
        &self,
        connection: &dyn Connection,
        event: &mut InboundEvent,
    ) -> Result<(), DispatchError> {
        for middleware in self.middleware.iter() {
            middleware.on_event(connection, event)?;
        }
        Ok(())
    }

    /// Number of middleware.
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

impl Default for EventChain {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for EventChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChain")
            .field("len", &self.middleware.len())
            .finish()
    }
}

/// Connection middleware built from a closure. See [`connect_fn`].
pub struct ConnectFn<F>(F);

/// Use a closure as connection middleware.
pub fn connect_fn<F>(f: F) -> ConnectFn<F>
where
    F: Fn(&dyn Connection) -> Result<(), DispatchError> + Send + Sync + 'static,
{
    ConnectFn(f)
}

impl<F> ConnectionMiddleware for ConnectFn<F>
where
    F: Fn(&dyn Connection) -> Result<(), DispatchError> + Send + Sync + 'static,
{
    fn on_connect(&self, connection: &dyn Connection) -> Result<(), DispatchError> {
        (self.0)(connection)
    }
}

/// Event middleware built from a closure. See [`event_fn`].
pub struct EventFn<F>(F);

/// Use a closure as event middleware.
pub fn event_fn<F>(f: F) -> EventFn<F>
where
    F: Fn(&dyn Connection, &mut InboundEvent) -> Result<(), DispatchError> + Send + Sync + 'static,
{
    EventFn(f)
}

impl<F> EventMiddleware for EventFn<F>
where
    F: Fn(&dyn Connection, &mut InboundEvent) -> Result<(), DispatchError> + Send + Sync + 'static,
{
    fn on_event(
        &self,
        connection: &dyn Connection,
        event: &mut InboundEvent,
    ) -> Result<(), DispatchError> {
        (self.0)(connection, event)
    }
}

/// Error observer built from a closure. See [`observer_fn`].
pub struct ObserverFn<F>(F);

/// Use a closure as an error observer.
pub fn observer_fn<F>(f: F) -> ObserverFn<F>
where
    F: Fn(&dyn Connection, &DispatchError) + Send + Sync + 'static,
{
    ObserverFn(f)
}

impl<F> ErrorObserver for ObserverFn<F>
where
    F: Fn(&dyn Connection, &DispatchError) + Send + Sync + 'static,
{
    fn on_error(&self, connection: &dyn Connection, error: &DispatchError) {
        (self.0)(connection, error)
    }
}

/// Logs accepted connections and inbound events. Never rejects.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl ConnectionMiddleware for LoggingMiddleware {
    fn on_connect(&self, connection: &dyn Connection) -> Result<(), DispatchError> {
        tracing::info!(
            connection = %connection.id(),
            locale = connection.locale(),
            "connection accepted"
        );
        Ok(())
    }
}

impl EventMiddleware for LoggingMiddleware {
    fn on_event(
        &self,
        connection: &dyn Connection,
        event: &mut InboundEvent,
    ) -> Result<(), DispatchError> {
        tracing::info!(
            connection = %connection.id(),
            event = event.name(),
            args = event.args().len(),
            "processing event"
        );
        Ok(())
    }
}

/// Logs every raised error at a level matching its kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ErrorObserver for TracingObserver {
    fn on_error(&self, connection: &dyn Connection, error: &DispatchError) {
        match error.kind() {
            ErrorKind::Unclassified => {
                tracing::error!(connection = %connection.id(), %error, "unclassified error");
            }
            kind => {
                tracing::warn!(connection = %connection.id(), ?kind, %error, "client error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConnection;
    use serde_json::json;
    use sockwire_core::ClientError;

    #[test]
    fn test_chain_runs_in_order_and_rewrites() {
        let middleware: Vec<Arc<dyn EventMiddleware>> = vec![
            Arc::new(event_fn(|_, event: &mut InboundEvent| {
                event.args_mut().push(json!("first"));
                Ok(())
            })),
            Arc::new(event_fn(|_, event: &mut InboundEvent| {
                event.args_mut().push(json!("second"));
                Ok(())
            })),
        ];
        let chain = EventChain::new(middleware);
        let connection = MockConnection::new("c1");
        let mut event = InboundEvent::new("ping", Vec::new());
        chain.run(&*connection, &mut event).unwrap();
        assert_eq!(event.args(), [json!("first"), json!("second")]);
    }

    #[test]
    fn test_chain_stops_at_first_rejection() {
        let middleware: Vec<Arc<dyn EventMiddleware>> = vec![
            Arc::new(event_fn(|_, _: &mut InboundEvent| {
                Err(ClientError::new(429, "slow down").into())
            })),
            Arc::new(event_fn(|_, event: &mut InboundEvent| {
                event.args_mut().clear();
                Ok(())
            })),
        ];
        let chain = EventChain::new(middleware);
        let connection = MockConnection::new("c1");
        let mut event = InboundEvent::new("ping", vec![json!(1)]);
        let err = chain.run(&*connection, &mut event).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Client);
        assert_eq!(event.args(), [json!(1)]);
    }

    #[test]
    fn test_logging_middleware_never_rejects() {
        let connection = MockConnection::new("c1");
        let mut event = InboundEvent::new("ping", Vec::new());
        assert!(LoggingMiddleware.on_connect(&*connection).is_ok());
        assert!(LoggingMiddleware.on_event(&*connection, &mut event).is_ok());
        assert!(EventChain::default().is_empty());
    }
}
