//! Error taxonomy for sockwire.
//!
//! Every error raised while a connection is set up or an event is processed
//! resolves to exactly one [`DispatchError`] variant:
//!
//! - [`ClientError`] - a client-facing failure (4xx). Code `401` is the
//!   unauthenticated sub-kind and additionally disconnects the client.
//! - [`ClientRedirection`] - the client must go elsewhere; always disconnects.
//! - [`UnclassifiedError`] - anything else. Reported to the health channel and
//!   hidden from the client outside development runs.
//!
//! [`RegistryError`] covers mistakes in the startup registration list.

use crate::wire::{ErrorPayload, RedirectPayload};
use serde_json::Value;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The single error type flowing into the error sink.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A client-facing error (4xx-equivalent).
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The client must be redirected and disconnected.
    #[error(transparent)]
    Redirect(#[from] ClientRedirection),

    /// Any error that was not raised as one of the client-facing kinds.
    #[error(transparent)]
    Unclassified(#[from] UnclassifiedError),
}

/// Discriminant of a [`DispatchError`], handy for logs and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// [`DispatchError::Client`] with any code but 401.
    Client,
    /// [`DispatchError::Client`] with code 401.
    ClientAuth,
    /// [`DispatchError::Redirect`].
    Redirect,
    /// [`DispatchError::Unclassified`].
    Unclassified,
}

impl DispatchError {
    /// Wrap a foreign error as an unclassified error, keeping its type name.
    pub fn unclassified<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DispatchError::Unclassified(UnclassifiedError::new(error))
    }

    /// Classify a boxed error raised outside the typed pipeline.
    ///
    /// Errors that are already part of the taxonomy keep their kind; anything
    /// else becomes [`DispatchError::Unclassified`].
    pub fn from_boxed(error: BoxError) -> Self {
        let error = match error.downcast::<DispatchError>() {
            Ok(error) => return *error,
            Err(other) => other,
        };
        let error = match error.downcast::<ClientError>() {
            Ok(error) => return DispatchError::Client(*error),
            Err(other) => other,
        };
        let error = match error.downcast::<ClientRedirection>() {
            Ok(error) => return DispatchError::Redirect(*error),
            Err(other) => other,
        };
        match error.downcast::<UnclassifiedError>() {
            Ok(error) => DispatchError::Unclassified(*error),
            Err(other) => DispatchError::Unclassified(UnclassifiedError::boxed(other)),
        }
    }

    /// The kind this error classifies as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Client(error) if error.is_unauthenticated() => ErrorKind::ClientAuth,
            DispatchError::Client(_) => ErrorKind::Client,
            DispatchError::Redirect(_) => ErrorKind::Redirect,
            DispatchError::Unclassified(_) => ErrorKind::Unclassified,
        }
    }
}

impl From<BoxError> for DispatchError {
    fn from(err: BoxError) -> Self {
        DispatchError::from_boxed(err)
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::unclassified(err)
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        DispatchError::unclassified(err)
    }
}

/// A client-facing error carrying a 4xx-equivalent code.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("client error {code}: {message}")]
pub struct ClientError {
    code: u16,
    message: String,
    descriptor: Option<Value>,
}

impl ClientError {
    /// Malformed input.
    pub const BAD_REQUEST: u16 = 400;
    /// Missing or invalid credentials. Disconnects the client.
    pub const UNAUTHORIZED: u16 = 401;
    /// Authenticated but not allowed.
    pub const FORBIDDEN: u16 = 403;
    /// The addressed resource does not exist.
    pub const NOT_FOUND: u16 = 404;
    /// The request conflicts with current state.
    pub const CONFLICT: u16 = 409;
    /// The client is sending too much.
    pub const TOO_MANY_REQUESTS: u16 = 429;

    /// Create a client error with an explicit code.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            descriptor: None,
        }
    }

    /// 400.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Self::BAD_REQUEST, message)
    }

    /// 401. Disconnects the client after the error is emitted.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(Self::UNAUTHORIZED, message)
    }

    /// 403.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(Self::FORBIDDEN, message)
    }

    /// 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Self::NOT_FOUND, message)
    }

    /// 409.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(Self::CONFLICT, message)
    }

    /// Attach a structured descriptor (for example validation details).
    pub fn with_descriptor(mut self, descriptor: Value) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    /// The error code.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The client-visible message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The structured descriptor, if any.
    pub fn descriptor(&self) -> Option<&Value> {
        self.descriptor.as_ref()
    }

    /// Whether this is the unauthenticated (401) sub-kind.
    pub fn is_unauthenticated(&self) -> bool {
        self.code == Self::UNAUTHORIZED
    }

    /// The payload emitted with the `error` event.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code,
            message: self.message.clone(),
            descriptor: self.descriptor.clone(),
        }
    }
}

/// Instructs the client to navigate to another target, then disconnects it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("redirect to {target}")]
pub struct ClientRedirection {
    target: String,
}

impl ClientRedirection {
    /// Redirect to `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// The redirect target.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The payload emitted with the `redirect` event.
    pub fn to_payload(&self) -> RedirectPayload {
        RedirectPayload {
            target: self.target.clone(),
        }
    }
}

/// An error nobody raised as client-facing.
///
/// Keeps the originating type name and a backtrace captured at the point of
/// wrapping. The backtrace is always captured, whatever `RUST_BACKTRACE` says.
pub struct UnclassifiedError {
    name: String,
    source: BoxError,
    backtrace: Backtrace,
}

impl UnclassifiedError {
    /// Wrap a typed error.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            name: short_type_name(std::any::type_name::<E>()),
            source: Box::new(error),
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Wrap an already boxed error whose concrete type is unknown.
    pub fn boxed(error: BoxError) -> Self {
        Self {
            name: "Error".to_owned(),
            source: error,
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Build an unclassified error from a bare message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            name: "Error".to_owned(),
            source: message.into(),
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Name of the wrapped error type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Message of the wrapped error.
    pub fn message(&self) -> String {
        self.source.to_string()
    }

    /// The wrapped error.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// A textual stack: the cause chain followed by the captured backtrace.
    pub fn stack(&self) -> String {
        let mut stack = format!("{}: {}", self.name, self.source);
        let mut cause = self.source.source();
        while let Some(err) = cause {
            stack.push_str("\n    caused by: ");
            stack.push_str(&err.to_string());
            cause = err.source();
        }
        if self.backtrace.status() == BacktraceStatus::Captured {
            stack.push('\n');
            stack.push_str(&self.backtrace.to_string());
        }
        stack
    }
}

impl fmt::Debug for UnclassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnclassifiedError")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for UnclassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.source)
    }
}

impl std::error::Error for UnclassifiedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Errors in the startup registration list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two handlers claim the same event.
    #[error("a handler is already registered for event `{0}`")]
    DuplicateEvent(&'static str),

    /// A handler declared an empty event name.
    #[error("handler declares an empty event name")]
    EmptyEventName,
}

fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Error)]
    #[error("database offline")]
    struct DatabaseDown;

    #[test]
    fn test_kind_of_each_variant() {
        assert_eq!(
            DispatchError::from(ClientError::bad_request("x")).kind(),
            ErrorKind::Client
        );
        assert_eq!(
            DispatchError::from(ClientError::unauthorized("x")).kind(),
            ErrorKind::ClientAuth
        );
        assert_eq!(
            DispatchError::from(ClientRedirection::new("/login")).kind(),
            ErrorKind::Redirect
        );
        assert_eq!(
            DispatchError::unclassified(DatabaseDown).kind(),
            ErrorKind::Unclassified
        );
    }

    #[test]
    fn test_unclassified_keeps_type_name() {
        let err = UnclassifiedError::new(DatabaseDown);
        assert_eq!(err.name(), "DatabaseDown");
        assert_eq!(err.message(), "database offline");
        assert!(err.stack().starts_with("DatabaseDown: database offline"));
    }

    #[test]
    fn test_stack_carries_backtrace_frames() {
        let err = UnclassifiedError::new(DatabaseDown);
        let stack = err.stack();
        assert!(stack.lines().count() > 1, "stack has no frames: {stack}");
        assert!(UnclassifiedError::msg("plain").stack().lines().count() > 1);
    }

    #[test]
    fn test_msg_and_inner() {
        let err = UnclassifiedError::msg("queue full");
        assert_eq!(err.name(), "Error");
        assert_eq!(err.inner().to_string(), "queue full");

        let err = UnclassifiedError::new(DatabaseDown);
        assert!(err.inner().downcast_ref::<DatabaseDown>().is_some());
    }

    #[test]
    fn test_from_boxed_recovers_taxonomy() {
        let boxed: BoxError = Box::new(ClientRedirection::new("/home"));
        assert!(matches!(
            DispatchError::from_boxed(boxed),
            DispatchError::Redirect(r) if r.target() == "/home"
        ));

        let boxed: BoxError = Box::new(ClientError::forbidden("no"));
        assert_eq!(DispatchError::from_boxed(boxed).kind(), ErrorKind::Client);

        let boxed: BoxError = Box::new(DispatchError::from(ClientError::unauthorized("who")));
        assert_eq!(DispatchError::from_boxed(boxed).kind(), ErrorKind::ClientAuth);

        let boxed: BoxError = "socket exploded".into();
        match DispatchError::from_boxed(boxed) {
            DispatchError::Unclassified(err) => assert_eq!(err.message(), "socket exploded"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_client_error_payload() {
        let err = ClientError::bad_request("Bad payload").with_descriptor(json!([{"path": ["a"]}]));
        let payload = err.to_payload();
        assert_eq!(payload.code, 400);
        assert_eq!(payload.message, "Bad payload");
        assert_eq!(payload.descriptor, Some(json!([{"path": ["a"]}])));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("std::io::error::Error"), "Error");
        assert_eq!(short_type_name("my::Wrapper<other::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
