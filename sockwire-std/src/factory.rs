//! # Handler Factory
//!
//! Binds a fixed, startup-time list of handler types to each connection.
//!
//! For every inbound event of a bound handler the factory runs, in order:
//!
//! 1. skip if the connection is already closed
//! 2. the event middleware chain
//! 3. the handler guard (`Proceed`, `Drop` or `Reject`)
//! 4. payload validation, argument by argument, failing fast with `400`
//! 5. the handler body, spawned as its own task
//!
//! Any failure in steps 2 to 5 is raised into the connection's
//! [`ErrorSink`]; nothing is emitted to the client directly.
//!
//! ```rust,ignore
//! let factory = HandlerFactory::builder(state)
//!     .register::<Ping>()
//!     .register::<SubmitAnswer>()
//!     .build()?;
//! ```

use crate::{
    middleware::EventChain,
    sink::ErrorSink,
    task::Spawner,
    validator::{
        BAD_PAYLOAD, PayloadValidator, Translator, ValidationContext, Validator, ValidatorConfig,
    },
};
use serde_json::Value;
use sockwire_core::{
    BindHandler, ClientError, ConnectionRef, DynEventHandler, Guard, InboundEvent, PayloadSchema,
    RegistryError, Schema,
};
use std::{collections::HashSet, fmt, sync::Arc};

type Binder<S> = Box<dyn Fn(&Arc<S>, &ConnectionRef) -> Arc<dyn DynEventHandler> + Send + Sync>;

struct Registration<S> {
    event: &'static str,
    bind: Binder<S>,
}

/// Builder for [`HandlerFactory`].
pub struct HandlerFactoryBuilder<S> {
    server: Arc<S>,
    registrations: Vec<Registration<S>>,
    config: ValidatorConfig,
    translator: Translator,
    spawner: Option<Spawner>,
}

impl<S: Send + Sync + 'static> HandlerFactoryBuilder<S> {
    /// Register a handler type. Each connection gets its own instance.
    pub fn register<H: BindHandler<S>>(mut self) -> Self {
        self.registrations.push(Registration {
            event: H::EVENT,
            bind: Box::new(
                |server: &Arc<S>, connection: &ConnectionRef| -> Arc<dyn DynEventHandler> {
                    Arc::new(H::bind(server, connection))
                },
            ),
        });
        self
    }

    /// Options applied to every payload schema.
    pub fn validation(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a translation handle.
    pub fn translator(mut self, translator: Translator) -> Self {
        self.translator = translator;
        self
    }

    /// Run handler bodies on a specific runtime.
    pub fn spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Check the registration list and build the factory.
    pub fn build(self) -> Result<HandlerFactory<S>, RegistryError> {
        let mut seen = HashSet::new();
        for registration in &self.registrations {
            if registration.event.is_empty() {
                return Err(RegistryError::EmptyEventName);
            }
            if !seen.insert(registration.event) {
                return Err(RegistryError::DuplicateEvent(registration.event));
            }
        }

        tracing::debug!(
            handlers = self.registrations.len(),
            "handler factory built"
        );

        Ok(HandlerFactory {
            server: self.server,
            registrations: self.registrations,
            payloads: Arc::new(PayloadValidation {
                config: self.config,
                translator: self.translator,
            }),
            spawner: self.spawner.unwrap_or_else(Spawner::current),
        })
    }
}

/// Instantiates and binds handlers for each connection.
pub struct HandlerFactory<S> {
    server: Arc<S>,
    registrations: Vec<Registration<S>>,
    payloads: Arc<PayloadValidation>,
    spawner: Spawner,
}

impl<S: Send + Sync + 'static> HandlerFactory<S> {
    /// Start a registration list over the shared server handle.
    pub fn builder(server: Arc<S>) -> HandlerFactoryBuilder<S> {
        HandlerFactoryBuilder {
            server,
            registrations: Vec::new(),
            config: ValidatorConfig::default(),
            translator: Translator::new(),
            spawner: None,
        }
    }

    /// The shared server handle.
    pub fn server(&self) -> &Arc<S> {
        &self.server
    }

    /// Registered event names, in registration order.
    pub fn events(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registrations.iter().map(|registration| registration.event)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// The translation handle used for validation messages.
    pub fn translator(&self) -> &Translator {
        &self.payloads.translator
    }

    /// Validate `args` against the schemas of `handler`.
    pub fn validate_payloads(
        &self,
        handler: &dyn DynEventHandler,
        args: Vec<Value>,
        language: Option<&str>,
    ) -> Result<Vec<Value>, ClientError> {
        self.payloads.validate(handler, args, language)
    }

    /// Instantiate every handler for `connection` and subscribe it to its
    /// event. Returns the number of bound handlers.
    pub fn bind(&self, connection: &ConnectionRef, events: &EventChain, sink: &ErrorSink) -> usize {
        for registration in &self.registrations {
            let bound = BoundHandler {
                handler: (registration.bind)(&self.server, connection),
                connection: Arc::clone(connection),
                events: events.clone(),
                sink: sink.clone(),
                payloads: Arc::clone(&self.payloads),
                spawner: self.spawner.clone(),
            };
            connection.on(
                registration.event,
                Box::new(move |args: Vec<Value>| bound.dispatch(args)),
            );
        }
        tracing::debug!(
            connection = %connection.id(),
            handlers = self.registrations.len(),
            "handlers bound"
        );
        self.registrations.len()
    }
}

impl<S> fmt::Debug for HandlerFactory<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let events: Vec<&str> = self.registrations.iter().map(|r| r.event).collect();
        f.debug_struct("HandlerFactory")
            .field("events", &events)
            .finish_non_exhaustive()
    }
}

struct PayloadValidation {
    config: ValidatorConfig,
    translator: Translator,
}

impl PayloadValidation {
    fn validate(
        &self,
        handler: &dyn DynEventHandler,
        mut args: Vec<Value>,
        language: Option<&str>,
    ) -> Result<Vec<Value>, ClientError> {
        let context = ValidationContext { language };
        match handler.validator_dyn() {
            PayloadSchema::Raw => {}
            PayloadSchema::Single(schema) => self.validate_slot(schema, &mut args, 0, &context)?,
            PayloadSchema::Positional(slots) => {
                for (index, slot) in slots.into_iter().enumerate() {
                    if let Some(schema) = slot {
                        self.validate_slot(schema, &mut args, index, &context)?;
                    }
                }
            }
        }
        Ok(args)
    }

    fn validate_slot(
        &self,
        schema: Schema,
        args: &mut [Value],
        index: usize,
        context: &ValidationContext<'_>,
    ) -> Result<(), ClientError> {
        let checker = PayloadValidator::new(
            Validator::new()
                .schema(schema, self.config.clone())
                .translator(self.translator.clone()),
            BAD_PAYLOAD,
        );
        let value = args.get_mut(index).map(std::mem::take);
        let validated = checker.check(value, context)?;
        if let (Some(slot), Some(value)) = (args.get_mut(index), validated) {
            *slot = value;
        }
        Ok(())
    }
}

struct BoundHandler {
    handler: Arc<dyn DynEventHandler>,
    connection: ConnectionRef,
    events: EventChain,
    sink: ErrorSink,
    payloads: Arc<PayloadValidation>,
    spawner: Spawner,
}

impl BoundHandler {
    fn dispatch(&self, args: Vec<Value>) {
        let event = self.handler.event();
        if !self.connection.connected() {
            tracing::trace!(event, connection = %self.connection.id(), "connection closed, event skipped");
            return;
        }

        let mut inbound = InboundEvent::new(event, args);
        if let Err(error) = self.events.run(&*self.connection, &mut inbound) {
            self.sink.raise(error);
            return;
        }
        let args = inbound.into_args();

        match self.handler.guard_dyn(&*self.connection, &args) {
            Guard::Proceed => {}
            Guard::Drop => {
                tracing::debug!(event, connection = %self.connection.id(), "event dropped by guard");
                return;
            }
            Guard::Reject(error) => {
                self.sink.raise(error);
                return;
            }
        }

        let args = match self
            .payloads
            .validate(&*self.handler, args, self.connection.locale())
        {
            Ok(args) => args,
            Err(error) => {
                self.sink.raise(error.into());
                return;
            }
        };

        let span = tracing::info_span!("event_handler", event, connection = %self.connection.id());
        self.spawner.spawn(
            event,
            Arc::clone(&self.handler).handle_dyn(args),
            self.sink.clone(),
            span,
        );
    }
}
