//! Error classification.
//!
//! [`ErrorDispatcher`] turns one [`DispatchError`] into exactly one client
//! reaction. Redirections are matched first, then client errors, and
//! everything else is an unclassified failure:
//!
//! | error | reaction |
//! |---|---|
//! | redirect | emit `redirect {target}`, disconnect |
//! | client 401 | emit `error {code, message, descriptor?}`, disconnect |
//! | client | emit `error {code, message, descriptor?}` |
//! | unclassified | report to health, emit `error {code: 500, ...}` |

use serde_json::json;
use sockwire_core::{
    Connection, DispatchError, ERROR_EVENT, ErrorObserver, ErrorPayload, ExecutionMode,
    HealthReporter, REDIRECT_EVENT, RedirectPayload, UnclassifiedError,
};
use std::{fmt, sync::Arc};

/// What the dispatcher does for one error.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Emit an `error` event.
    EmitError(ErrorPayload),
    /// Emit an `error` event, then disconnect.
    EmitErrorAndDisconnect(ErrorPayload),
    /// Emit a `redirect` event, then disconnect.
    RedirectAndDisconnect(RedirectPayload),
    /// Send `report` to the health channel, then emit an `error` event.
    ReportAndEmit {
        /// Health report.
        report: String,
        /// Client payload.
        payload: ErrorPayload,
    },
}

impl Resolution {
    /// Whether the connection is closed afterwards.
    pub fn disconnects(&self) -> bool {
        matches!(
            self,
            Resolution::EmitErrorAndDisconnect(_) | Resolution::RedirectAndDisconnect(_)
        )
    }

    /// The emitted event name.
    pub fn event(&self) -> &'static str {
        match self {
            Resolution::RedirectAndDisconnect(_) => REDIRECT_EVENT,
            _ => ERROR_EVENT,
        }
    }
}

/// The default error observer.
#[derive(Clone)]
pub struct ErrorDispatcher {
    reporter: Arc<dyn HealthReporter>,
    mode: Arc<dyn ExecutionMode>,
}

impl ErrorDispatcher {
    /// Dispatcher reporting to `reporter`; `mode` decides whether internal
    /// details reach the client.
    pub fn new(reporter: impl HealthReporter, mode: impl ExecutionMode) -> Self {
        Self {
            reporter: Arc::new(reporter),
            mode: Arc::new(mode),
        }
    }

    /// Dispatcher over already shared ports.
    pub fn from_shared(reporter: Arc<dyn HealthReporter>, mode: Arc<dyn ExecutionMode>) -> Self {
        Self { reporter, mode }
    }

    /// Decide the reaction without performing it.
    pub fn classify(&self, error: &DispatchError) -> Resolution {
        match error {
            DispatchError::Redirect(redirect) => {
                Resolution::RedirectAndDisconnect(redirect.to_payload())
            }
            DispatchError::Client(error) if error.is_unauthenticated() => {
                Resolution::EmitErrorAndDisconnect(error.to_payload())
            }
            DispatchError::Client(error) => Resolution::EmitError(error.to_payload()),
            DispatchError::Unclassified(error) => Resolution::ReportAndEmit {
                report: format!(
                    "Unhandled error: '{}': '{}'.\n{}",
                    error.name(),
                    error.message(),
                    error.stack()
                ),
                payload: if self.mode.is_development() {
                    debug_payload(error)
                } else {
                    ErrorPayload::internal()
                },
            },
        }
    }

    /// Classify `error` and perform the reaction on `connection`.
    pub fn dispatch(&self, connection: &dyn Connection, error: &DispatchError) -> Resolution {
        let resolution = self.classify(error);
        tracing::debug!(
            connection = %connection.id(),
            kind = ?error.kind(),
            disconnects = resolution.disconnects(),
            "dispatching error"
        );

        match &resolution {
            Resolution::EmitError(payload) => {
                connection.emit(ERROR_EVENT, payload.clone().into_value());
            }
            Resolution::EmitErrorAndDisconnect(payload) => {
                connection.emit(ERROR_EVENT, payload.clone().into_value());
                connection.disconnect();
            }
            Resolution::RedirectAndDisconnect(payload) => {
                connection.emit(REDIRECT_EVENT, payload.clone().into_value());
                connection.disconnect();
            }
            Resolution::ReportAndEmit { report, payload } => {
                self.reporter.report(report);
                connection.emit(ERROR_EVENT, payload.clone().into_value());
            }
        }
        resolution
    }
}

impl ErrorObserver for ErrorDispatcher {
    fn on_error(&self, connection: &dyn Connection, error: &DispatchError) {
        self.dispatch(connection, error);
    }
}

impl fmt::Debug for ErrorDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorDispatcher")
            .field("development", &self.mode.is_development())
            .finish_non_exhaustive()
    }
}

fn debug_payload(error: &UnclassifiedError) -> ErrorPayload {
    ErrorPayload {
        code: 500,
        message: error.message(),
        descriptor: Some(json!({
            "name": error.name(),
            "stack": error.stack(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnection, RecordingReporter};
    use serde_json::json;
    use sockwire_core::{ClientError, ClientRedirection};

    #[derive(Debug, thiserror::Error)]
    #[error("database is down")]
    struct DatabaseDown;

    fn dispatcher(development: bool) -> (ErrorDispatcher, RecordingReporter) {
        let reporter = RecordingReporter::new();
        (ErrorDispatcher::new(reporter.clone(), development), reporter)
    }

    #[test]
    fn test_client_error_emits_without_disconnect() {
        let (dispatcher, reporter) = dispatcher(false);
        let connection = MockConnection::new("c1");
        let error = ClientError::forbidden("not yours").into();

        let resolution = dispatcher.dispatch(&*connection, &error);
        assert!(!resolution.disconnects());
        assert_eq!(
            connection.emitted(),
            vec![("error".to_owned(), json!({"code": 403, "message": "not yours"}))]
        );
        assert!(connection.connected());
        assert_eq!(reporter.count(), 0);
    }

    #[test]
    fn test_unauthenticated_emits_then_disconnects() {
        let (dispatcher, _) = dispatcher(false);
        let connection = MockConnection::new("c1");
        dispatcher.dispatch(&*connection, &ClientError::unauthorized("login").into());

        assert_eq!(connection.emitted_to("error"), vec![json!({"code": 401, "message": "login"})]);
        assert_eq!(connection.disconnects(), 1);
    }

    #[test]
    fn test_redirect_emits_target_then_disconnects() {
        let (dispatcher, _) = dispatcher(false);
        let connection = MockConnection::new("c1");
        dispatcher.dispatch(&*connection, &ClientRedirection::new("/login").into());

        assert_eq!(connection.emitted_to("redirect"), vec![json!({"target": "/login"})]);
        assert!(connection.emitted_to("error").is_empty());
        assert!(!connection.connected());
    }

    #[test]
    fn test_unclassified_hidden_outside_development() {
        let (dispatcher, reporter) = dispatcher(false);
        let connection = MockConnection::new("c1");
        dispatcher.dispatch(&*connection, &DispatchError::unclassified(DatabaseDown));

        assert_eq!(
            connection.emitted_to("error"),
            vec![json!({"code": 500, "message": "Internal error"})]
        );
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].starts_with("Unhandled error: 'DatabaseDown': 'database is down'.\n"));
        assert!(connection.connected());
    }

    #[test]
    fn test_unclassified_detailed_in_development() {
        let (dispatcher, _) = dispatcher(true);
        let resolution = dispatcher.classify(&DispatchError::unclassified(DatabaseDown));
        let Resolution::ReportAndEmit { payload, .. } = resolution else {
            panic!("expected a report");
        };
        assert_eq!(payload.code, 500);
        assert_eq!(payload.message, "database is down");
        let descriptor = payload.descriptor.unwrap();
        assert_eq!(descriptor["name"], json!("DatabaseDown"));
        let stack = descriptor["stack"].as_str().unwrap();
        assert!(stack.starts_with("DatabaseDown: database is down\n"));
        assert!(stack.lines().count() > 1);
    }

    #[test]
    fn test_shared_ports() {
        let reporter = RecordingReporter::new();
        let dispatcher = ErrorDispatcher::from_shared(Arc::new(reporter.clone()), Arc::new(true));
        let connection = MockConnection::new("c1");
        dispatcher.dispatch(&*connection, &DispatchError::unclassified(DatabaseDown));

        assert_eq!(reporter.count(), 1);
        assert_eq!(connection.emitted_to("error")[0]["message"], json!("database is down"));
    }

    #[test]
    fn test_classification_is_stable() {
        let (dispatcher, _) = dispatcher(false);
        let error: DispatchError = ClientError::bad_request("x").into();
        assert_eq!(dispatcher.classify(&error), dispatcher.classify(&error));
        assert_eq!(dispatcher.classify(&error).event(), "error");
    }
}
