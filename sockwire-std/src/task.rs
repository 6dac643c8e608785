//! Handler task spawning.
//!
//! Every accepted event runs its handler body as its own tokio task. The
//! dispatching listener never waits for it. Bodies of the same connection may
//! therefore interleave.

use crate::sink::ErrorSink;
use futures::FutureExt;
use sockwire_core::{DispatchError, HandlerFuture};
use std::{any::Any, panic::AssertUnwindSafe};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{Instrument, Span};

/// Failures of a handler task itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The handler body panicked.
    #[error("event handler panicked: {0}")]
    Panicked(String),

    /// No tokio runtime was available to run the handler body.
    #[error("no tokio runtime available to run the `{0}` handler")]
    NoRuntime(&'static str),
}

/// Where handler bodies run.
#[derive(Debug, Clone, Default)]
pub struct Spawner {
    handle: Option<Handle>,
}

impl Spawner {
    /// Capture the runtime of the calling context, if any.
    ///
    /// Without one, the runtime is looked up again at each spawn.
    pub fn current() -> Self {
        Self {
            handle: Handle::try_current().ok(),
        }
    }

    /// Spawn onto a specific runtime.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Run `body` as a detached task. Its error, or its panic, is raised into
    /// `sink`.
    pub fn spawn(&self, event: &'static str, body: HandlerFuture, sink: ErrorSink, span: Span) {
        let Some(handle) = self.handle.clone().or_else(|| Handle::try_current().ok()) else {
            sink.raise(DispatchError::unclassified(TaskError::NoRuntime(event)));
            return;
        };

        let task = async move {
            match AssertUnwindSafe(body).catch_unwind().await {
                Ok(Ok(())) => tracing::trace!("handler completed"),
                Ok(Err(error)) => sink.raise(error),
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(%message, "handler panicked");
                    sink.raise(DispatchError::unclassified(TaskError::Panicked(message)));
                }
            }
        };
        handle.spawn(task.instrument(span));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
