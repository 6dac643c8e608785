//! Operational ports consumed by error classification.

/// Health-reporting channel for unexpected failures.
///
/// Reporting is fire-and-forget: implementations must not fail or block the
/// dispatch path.
pub trait HealthReporter: Send + Sync + 'static {
    /// Report a fully formatted failure message.
    fn report(&self, message: &str);
}

/// Answers "is this a development/debug run?".
///
/// Development runs leak unclassified error details to clients.
pub trait ExecutionMode: Send + Sync + 'static {
    /// `true` for development/debug runs.
    fn is_development(&self) -> bool;
}

impl ExecutionMode for bool {
    fn is_development(&self) -> bool {
        *self
    }
}
