//! # Event System Bootstrap
//!
//! Wires registry, container, resolver, invoker and publisher from an
//! [`EventsConfig`]. Hosts keep the returned [`EventSystem`] for the process
//! lifetime and call [`EventSystem::shutdown`] on the way out.
//!
//! ```rust,no_run
//! use storefront_events::bootstrap::EventSystem;
//! use storefront_events::config::EventsConfig;
//! use storefront_events::registry::DefaultConsumerRegistry;
//! use storefront_events::resolver::ServiceContainer;
//!
//! # async fn run() -> storefront_events::Result<()> {
//! let system = EventSystem::bootstrap(
//!     EventsConfig::default(),
//!     DefaultConsumerRegistry::new(),
//!     ServiceContainer::builder().build(),
//! )?;
//! let publisher = system.publisher();
//! // ... publish ...
//! system.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::config::EventsConfig;
use crate::dispatch::{ConsumerInvoker, DispatchStats};
use crate::error::Result;
use crate::events::{DispatchingEventPublisher, EventPublisher, NullEventPublisher};
use crate::logging::{self, ConsumerErrorLogger, NullErrorLogger, TracingErrorLogger};
use crate::registry::DefaultConsumerRegistry;
use crate::resolver::{ApplicationLifetime, DefaultConsumerResolver, ScopeFactory, ServiceContainer};

/// A running event system
pub struct EventSystem {
    config: EventsConfig,
    lifetime: ApplicationLifetime,
    publisher: Arc<dyn EventPublisher>,
    dispatcher: Option<Arc<DispatchingEventPublisher>>,
}

impl EventSystem {
    /// Bootstrap with the default error logger
    pub fn bootstrap(
        config: EventsConfig,
        registry: DefaultConsumerRegistry,
        container: ServiceContainer,
    ) -> Result<Self> {
        Self::builder(config)
            .registry(registry)
            .container(container)
            .build()
    }

    pub fn builder(config: EventsConfig) -> EventSystemBuilder {
        EventSystemBuilder::new(config)
    }

    /// The publisher business code should use
    pub fn publisher(&self) -> Arc<dyn EventPublisher> {
        Arc::clone(&self.publisher)
    }

    pub fn config(&self) -> &EventsConfig {
        &self.config
    }

    pub fn lifetime(&self) -> &ApplicationLifetime {
        &self.lifetime
    }

    pub fn is_enabled(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// Dispatch counters; `None` when the system is disabled
    pub fn statistics(&self) -> Option<DispatchStats> {
        self.dispatcher.as_ref().map(|dispatcher| dispatcher.statistics())
    }

    /// Signal cancellation to consumers and wait for detached work to drain
    pub async fn shutdown(&self) {
        self.lifetime.stop_application();

        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.invoker().wait_for_detached().await;
        }

        info!("Event system shut down");
    }
}

impl std::fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("config", &self.config)
            .field("enabled", &self.is_enabled())
            .field("stopping", &self.lifetime.is_stopping())
            .finish()
    }
}

/// Builder for [`EventSystem`]
pub struct EventSystemBuilder {
    config: EventsConfig,
    registry: DefaultConsumerRegistry,
    container: Option<ServiceContainer>,
    error_logger: Option<Arc<dyn ConsumerErrorLogger>>,
    lifetime: ApplicationLifetime,
    initialize_logging: bool,
}

impl EventSystemBuilder {
    pub fn new(config: EventsConfig) -> Self {
        Self {
            config,
            registry: DefaultConsumerRegistry::new(),
            container: None,
            error_logger: None,
            lifetime: ApplicationLifetime::new(),
            initialize_logging: false,
        }
    }

    pub fn registry(mut self, registry: DefaultConsumerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn container(mut self, container: ServiceContainer) -> Self {
        self.container = Some(container);
        self
    }

    /// Override the consumer error logger chosen from configuration
    pub fn error_logger(mut self, logger: Arc<dyn ConsumerErrorLogger>) -> Self {
        self.error_logger = Some(logger);
        self
    }

    /// Share an existing application lifetime instead of creating one
    pub fn lifetime(mut self, lifetime: ApplicationLifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Install the global tracing subscriber from `config.logging`
    pub fn initialize_logging(mut self, enabled: bool) -> Self {
        self.initialize_logging = enabled;
        self
    }

    pub fn build(self) -> Result<EventSystem> {
        self.config.validate()?;

        if self.initialize_logging {
            logging::init_structured_logging_with(&self.config.logging);
        }

        if !self.config.enabled {
            info!("Event system disabled - publishing to null publisher");
            return Ok(EventSystem {
                config: self.config,
                lifetime: self.lifetime,
                publisher: Arc::new(NullEventPublisher),
                dispatcher: None,
            });
        }

        let logger = self.error_logger.unwrap_or_else(|| {
            if self.config.log_consumer_errors {
                Arc::new(TracingErrorLogger) as Arc<dyn ConsumerErrorLogger>
            } else {
                Arc::new(NullErrorLogger)
            }
        });

        let container = self
            .container
            .unwrap_or_else(|| ServiceContainer::builder().build());
        let scopes: Arc<dyn ScopeFactory> = Arc::new(container);
        let resolver = Arc::new(DefaultConsumerResolver::new(self.lifetime.clone()));
        let invoker = ConsumerInvoker::new(resolver, Arc::clone(&scopes))
            .with_logger(logger)
            .with_detached_limit(self.config.detached_limit());

        let dispatcher = Arc::new(DispatchingEventPublisher::new(
            self.registry.into_shared(),
            Arc::new(invoker),
            scopes,
        ));

        info!(
            detached_concurrency_limit = self.config.detached_concurrency_limit,
            log_consumer_errors = self.config.log_consumer_errors,
            "Event system started"
        );

        Ok(EventSystem {
            config: self.config,
            lifetime: self.lifetime,
            publisher: Arc::clone(&dispatcher) as Arc<dyn EventPublisher>,
            dispatcher: Some(dispatcher),
        })
    }
}
