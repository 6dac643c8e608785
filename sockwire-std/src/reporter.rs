//! Health reporting through `tracing`.

use sockwire_core::HealthReporter;

/// Target of health events, for filtering with `EnvFilter`.
pub const HEALTH_TARGET: &str = "sockwire::health";

/// Emits health reports as `tracing` error events on [`HEALTH_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl HealthReporter for TracingReporter {
    fn report(&self, message: &str) {
        tracing::error!(target: HEALTH_TARGET, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::{
        Layer,
        layer::{Context, SubscriberExt},
    };

    #[derive(Clone, Default)]
    struct Targets(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for Targets {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0
                .lock()
                .unwrap()
                .push(event.metadata().target().to_owned());
        }
    }

    #[test]
    fn test_reports_use_health_target() {
        let targets = Targets::default();
        let subscriber = tracing_subscriber::registry().with(targets.clone());
        tracing::subscriber::with_default(subscriber, || TracingReporter.report("disk full"));
        assert_eq!(*targets.0.lock().unwrap(), [HEALTH_TARGET]);
    }
}
