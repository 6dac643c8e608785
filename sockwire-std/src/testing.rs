//! Testing utilities for sockwire.
//!
//! In-memory stand-ins for the transport boundary and the operational ports.
//!
//! # Features
//!
//! - [`MockConnection`]: records emissions and disconnects, fires events
//! - [`MockTransport`]: hands connections to registered listeners
//! - [`RecordingReporter`]: keeps every health report
//! - [`RecordingObserver`]: keeps the kind and message of every raised error

use serde_json::Value;
use sockwire_core::{
    BoxError, Connection, ConnectionListener, ConnectionRef, DispatchError, ErrorKind,
    ErrorObserver, EventListener, HealthReporter, Transport, TransportErrorListener,
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Mock Connection
// ============================================================================

/// Something that happened on a [`MockConnection`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    /// An event sent to the client.
    Emit {
        /// Event name.
        event: String,
        /// Payload.
        payload: Value,
    },
    /// A forced disconnect.
    Disconnect,
}

type SharedListener = Arc<dyn Fn(Vec<Value>) + Send + Sync>;
type SharedErrorListener = Arc<dyn Fn(BoxError) + Send + Sync>;

/// An in-memory connection.
///
/// Emissions after a disconnect are dropped, like a closed socket would, and
/// listeners are released on disconnect.
///
/// # Example
///
/// ```rust,ignore
/// let connection = MockConnection::new("c1");
/// server.accept(connection.clone());
///
/// connection.fire("ping", vec![json!(42)]);
/// assert_eq!(connection.emitted_to("pong"), vec![json!(42)]);
/// ```
pub struct MockConnection {
    id: String,
    locale: Option<String>,
    connected: AtomicBool,
    listeners: Mutex<HashMap<String, Vec<SharedListener>>>,
    error_listeners: Mutex<Vec<SharedErrorListener>>,
    log: Mutex<Vec<Recorded>>,
}

impl MockConnection {
    /// A connected connection.
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::build(id.into(), None))
    }

    /// A connected connection with a handshake language.
    pub fn with_locale(id: impl Into<String>, locale: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::build(id.into(), Some(locale.into())))
    }

    fn build(id: String, locale: Option<String>) -> Self {
        Self {
            id,
            locale,
            connected: AtomicBool::new(true),
            listeners: Mutex::new(HashMap::new()),
            error_listeners: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Deliver an inbound event. Returns how many listeners ran.
    pub fn fire(&self, event: &str, args: Vec<Value>) -> usize {
        let listeners: Vec<SharedListener> =
            lock(&self.listeners).get(event).cloned().unwrap_or_default();
        for listener in &listeners {
            listener(args.clone());
        }
        listeners.len()
    }

    /// Raise a transport error.
    pub fn fail(&self, error: impl Into<BoxError>) {
        let listeners: Vec<SharedErrorListener> = lock(&self.error_listeners).clone();
        let mut error = Some(error.into());
        for listener in &listeners {
            if let Some(error) = error.take() {
                listener(error);
            }
        }
    }

    /// Everything recorded so far, in order.
    pub fn records(&self) -> Vec<Recorded> {
        lock(&self.log).clone()
    }

    /// Every emission as `(event, payload)`.
    pub fn emitted(&self) -> Vec<(String, Value)> {
        lock(&self.log)
            .iter()
            .filter_map(|record| match record {
                Recorded::Emit { event, payload } => Some((event.clone(), payload.clone())),
                Recorded::Disconnect => None,
            })
            .collect()
    }

    /// Payloads emitted under `event`.
    pub fn emitted_to(&self, event: &str) -> Vec<Value> {
        self.emitted()
            .into_iter()
            .filter(|(name, _)| name == event)
            .map(|(_, payload)| payload)
            .collect()
    }

    /// Number of forced disconnects.
    pub fn disconnects(&self) -> usize {
        lock(&self.log)
            .iter()
            .filter(|record| matches!(record, Recorded::Disconnect))
            .count()
    }

    /// Sorted names of subscribed events.
    pub fn subscriptions(&self) -> Vec<String> {
        let mut events: Vec<String> = lock(&self.listeners).keys().cloned().collect();
        events.sort();
        events
    }

    /// Whether `event` has a listener.
    pub fn is_subscribed(&self, event: &str) -> bool {
        lock(&self.listeners).contains_key(event)
    }

    /// Number of transport error listeners.
    pub fn error_listener_count(&self) -> usize {
        lock(&self.error_listeners).len()
    }

    /// Forget recorded emissions and disconnects.
    pub fn clear(&self) {
        lock(&self.log).clear();
    }
}

impl Connection for MockConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn emit(&self, event: &str, payload: Value) {
        if self.connected() {
            lock(&self.log).push(Recorded::Emit {
                event: event.to_owned(),
                payload,
            });
        }
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        lock(&self.log).push(Recorded::Disconnect);
        lock(&self.listeners).clear();
        lock(&self.error_listeners).clear();
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn on(&self, event: &str, listener: EventListener) {
        lock(&self.listeners)
            .entry(event.to_owned())
            .or_default()
            .push(Arc::from(listener));
    }

    fn on_error(&self, listener: TransportErrorListener) {
        lock(&self.error_listeners).push(Arc::from(listener));
    }

    fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }
}

// ============================================================================
// Mock Transport
// ============================================================================

/// An in-memory transport.
#[derive(Default)]
pub struct MockTransport {
    listeners: Mutex<Vec<Arc<dyn Fn(ConnectionRef) + Send + Sync>>>,
}

impl MockTransport {
    /// A transport with no listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `connection`, notifying every listener.
    pub fn connect(&self, connection: ConnectionRef) {
        let listeners = lock(&self.listeners).clone();
        for listener in &listeners {
            listener(Arc::clone(&connection));
        }
    }

    /// Number of connection listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }
}

impl Transport for MockTransport {
    fn on_connection(&self, listener: ConnectionListener) {
        lock(&self.listeners).push(Arc::from(listener));
    }
}

// ============================================================================
// Recording Reporter
// ============================================================================

/// A health reporter that keeps every report.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports received so far.
    pub fn reports(&self) -> Vec<String> {
        lock(&self.reports).clone()
    }

    /// Number of reports.
    pub fn count(&self) -> usize {
        lock(&self.reports).len()
    }
}

impl HealthReporter for RecordingReporter {
    fn report(&self, message: &str) {
        lock(&self.reports).push(message.to_owned());
    }
}

// ============================================================================
// Recording Observer
// ============================================================================

/// An error observer that keeps the kind and display text of every error.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    errors: Arc<Mutex<Vec<(ErrorKind, String)>>>,
}

impl RecordingObserver {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors observed so far.
    pub fn errors(&self) -> Vec<(ErrorKind, String)> {
        lock(&self.errors).clone()
    }

    /// Kinds of the errors observed so far.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        lock(&self.errors).iter().map(|(kind, _)| *kind).collect()
    }

    /// Number of errors observed.
    pub fn count(&self) -> usize {
        lock(&self.errors).len()
    }
}

impl ErrorObserver for RecordingObserver {
    fn on_error(&self, _connection: &dyn Connection, error: &DispatchError) {
        lock(&self.errors).push((error.kind(), error.to_string()));
    }
}
