#![allow(dead_code)]

use sockwire::prelude::*;
use sockwire::testing::{MockConnection, RecordingObserver, RecordingReporter};
use sockwire::SocketServerBuilder;
use std::{
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

// ============================================================================
// Shared State
// ============================================================================

#[derive(Default)]
pub struct TestState {
    pub calls: Mutex<Vec<(String, Vec<Value>)>>,
    pub guard_calls: AtomicUsize,
    pub validator_calls: AtomicUsize,
}

impl TestState {
    pub fn record(&self, event: &str, args: Vec<Value>) {
        self.calls.lock().unwrap().push((event.to_owned(), args));
    }

    pub fn calls_for(&self, event: &str) -> Vec<Vec<Value>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, args)| args.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn guard_calls(&self) -> usize {
        self.guard_calls.load(Ordering::SeqCst)
    }

    pub fn validator_calls(&self) -> usize {
        self.validator_calls.load(Ordering::SeqCst)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("database is down")]
pub struct DatabaseDown;

// ============================================================================
// Test Handlers
// ============================================================================

pub struct Ping {
    state: Arc<TestState>,
}

impl EventHandler for Ping {
    const EVENT: &'static str = "ping";

    async fn handle(&self, args: Vec<Value>) -> HandlerResult {
        self.state.record(Self::EVENT, args);
        Ok(())
    }
}

impl BindHandler<TestState> for Ping {
    fn bind(server: &Arc<TestState>, _connection: &ConnectionRef) -> Self {
        Ping {
            state: Arc::clone(server),
        }
    }
}

pub struct SubmitAnswer {
    state: Arc<TestState>,
}

impl EventHandler for SubmitAnswer {
    const EVENT: &'static str = "submitAnswer";

    fn validator(&self) -> PayloadSchema {
        self.state.validator_calls.fetch_add(1, Ordering::SeqCst);
        Schema::object()
            .field("questionId", Schema::integer().required())
            .field("choice", Schema::string().required())
            .into()
    }

    async fn handle(&self, args: Vec<Value>) -> HandlerResult {
        self.state.record(Self::EVENT, args);
        Ok(())
    }
}

impl BindHandler<TestState> for SubmitAnswer {
    fn bind(server: &Arc<TestState>, _connection: &ConnectionRef) -> Self {
        SubmitAnswer {
            state: Arc::clone(server),
        }
    }
}

/// Proceeds only for `{"admin": true}`, drops everything else.
pub struct AdminOnly {
    state: Arc<TestState>,
}

impl EventHandler for AdminOnly {
    const EVENT: &'static str = "admin";

    fn validator(&self) -> PayloadSchema {
        self.state.validator_calls.fetch_add(1, Ordering::SeqCst);
        Schema::object().field("admin", Schema::boolean()).into()
    }

    fn guard(&self, _connection: &dyn Connection, args: &[Value]) -> Guard {
        self.state.guard_calls.fetch_add(1, Ordering::SeqCst);
        let admin = args
            .first()
            .and_then(|arg| arg.get("admin"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        admin.into()
    }

    async fn handle(&self, args: Vec<Value>) -> HandlerResult {
        self.state.record(Self::EVENT, args);
        Ok(())
    }
}

impl BindHandler<TestState> for AdminOnly {
    fn bind(server: &Arc<TestState>, _connection: &ConnectionRef) -> Self {
        AdminOnly {
            state: Arc::clone(server),
        }
    }
}

/// Rejects every event with `403`.
pub struct Vault {
    state: Arc<TestState>,
}

impl EventHandler for Vault {
    const EVENT: &'static str = "vault";

    fn guard(&self, _connection: &dyn Connection, _args: &[Value]) -> Guard {
        Guard::Reject(ClientError::forbidden("vault is locked").into())
    }

    async fn handle(&self, args: Vec<Value>) -> HandlerResult {
        self.state.record(Self::EVENT, args);
        Ok(())
    }
}

impl BindHandler<TestState> for Vault {
    fn bind(server: &Arc<TestState>, _connection: &ConnectionRef) -> Self {
        Vault {
            state: Arc::clone(server),
        }
    }
}

/// Fails every event with the error named by its first argument.
pub struct Fail;

impl EventHandler for Fail {
    const EVENT: &'static str = "fail";

    async fn handle(&self, args: Vec<Value>) -> HandlerResult {
        match args.first().and_then(Value::as_str) {
            Some("redirect") => Err(ClientRedirection::new("/login").into()),
            Some("unauthorized") => Err(ClientError::unauthorized("session expired").into()),
            Some("conflict") => Err(ClientError::conflict("already answered").into()),
            Some("panic") => panic!("handler crashed"),
            _ => Err(DispatchError::unclassified(DatabaseDown)),
        }
    }
}

impl BindHandler<TestState> for Fail {
    fn bind(_server: &Arc<TestState>, _connection: &ConnectionRef) -> Self {
        Fail
    }
}

/// Emits `pong` with its arguments.
pub struct Echo {
    connection: ConnectionRef,
}

impl EventHandler for Echo {
    const EVENT: &'static str = "echo";

    async fn handle(&self, args: Vec<Value>) -> HandlerResult {
        self.connection.emit("pong", Value::Array(args));
        Ok(())
    }
}

impl BindHandler<TestState> for Echo {
    fn bind(_server: &Arc<TestState>, connection: &ConnectionRef) -> Self {
        Echo {
            connection: Arc::clone(connection),
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

pub fn factory(state: Arc<TestState>) -> HandlerFactory<TestState> {
    HandlerFactory::builder(state)
        .register::<Ping>()
        .register::<SubmitAnswer>()
        .register::<AdminOnly>()
        .register::<Vault>()
        .register::<Fail>()
        .register::<Echo>()
        .build()
        .expect("registration list is valid")
}

pub struct Harness {
    pub state: Arc<TestState>,
    pub connection: Arc<MockConnection>,
    pub reporter: RecordingReporter,
    pub observer: RecordingObserver,
    pub server: SocketServer<TestState>,
}

pub fn builder(
    development: bool,
) -> (
    SocketServerBuilder<TestState>,
    Arc<TestState>,
    RecordingReporter,
    RecordingObserver,
) {
    let state = Arc::new(TestState::default());
    let reporter = RecordingReporter::new();
    let observer = RecordingObserver::new();
    let builder = SocketServer::builder(factory(Arc::clone(&state)))
        .error_observer(observer.clone())
        .error_observer(ErrorDispatcher::new(reporter.clone(), development));
    (builder, state, reporter, observer)
}

pub fn harness(development: bool) -> Harness {
    let (builder, state, reporter, observer) = builder(development);
    let server = builder.build();
    let connection = MockConnection::new("conn-1");
    assert!(server.accept(connection.clone()).is_accepted());
    Harness {
        state,
        connection,
        reporter,
        observer,
        server,
    }
}

/// Let spawned handler tasks run to completion.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(25)).await;
}
