#![allow(clippy::doc_markdown)] // Allow type names like ConsumeContext in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Storefront Events
//!
//! In-process event consumer dispatch for the storefront platform.
//!
//! ## Overview
//!
//! Business code publishes plain message types. Consumers register strongly
//! typed handler closures against those types (or against trait objects the
//! messages implement). The dispatcher resolves each consumer from a
//! dependency scope and runs it under one of four execution modes:
//!
//! | fire-and-forget | async | behaviour                                       |
//! |-----------------|-------|-------------------------------------------------|
//! | no              | no    | inline; failures logged and returned            |
//! | no              | yes   | own task, awaited; failures logged and returned |
//! | yes             | no    | blocking pool, private scope; failures logged   |
//! | yes             | yes   | background task, private scope; failures logged |
//!
//! ## Module Organization
//!
//! - [`events`] - Messages, envelopes and publishers
//! - [`registry`] - Consumer registration and lookup
//! - [`resolver`] - Service container, scopes and consumer resolution
//! - [`dispatch`] - The consumer invoker and dispatch statistics
//! - [`bootstrap`] - Wiring everything from configuration
//! - [`config`] - Environment-aware configuration
//! - [`logging`] - Structured logging setup and the consumer error logger
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storefront_events::bootstrap::EventSystem;
//! use storefront_events::config::EventsConfig;
//! use storefront_events::events::{EventPublisherExt, Message};
//! use storefront_events::registry::{Consumer, ConsumerRegistration, DefaultConsumerRegistry};
//! use storefront_events::resolver::{Arguments, ServiceContainer};
//!
//! struct OrderPlaced { order_id: u64 }
//! impl Message for OrderPlaced {}
//!
//! struct InventoryReservation;
//! impl Consumer for InventoryReservation {}
//!
//! # async fn run() -> storefront_events::Result<()> {
//! let mut registry = DefaultConsumerRegistry::new();
//! registry.register(ConsumerRegistration::sync(
//!     "HandleEvent",
//!     |_consumer: &InventoryReservation, message: Arc<OrderPlaced>, _args: &Arguments| {
//!         println!("reserving stock for order {}", message.order_id);
//!         Ok(())
//!     },
//! ))?;
//!
//! let container = ServiceContainer::builder()
//!     .add_transient(|_| Ok(InventoryReservation))
//!     .build();
//!
//! let system = EventSystem::bootstrap(EventsConfig::default(), registry, container)?;
//! system.publisher().publish(OrderPlaced { order_id: 42 }).await?;
//! system.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod logging;
pub mod registry;
pub mod resolver;

pub use bootstrap::{EventSystem, EventSystemBuilder};
pub use config::{ConfigManager, EventsConfig, LoggingConfig};
pub use dispatch::{ConsumerInvoker, DispatchStats};
pub use error::{BoxError, EventsError, HandlerError, HandlerResult, Result};
pub use events::{
    ConsumeContext, DispatchingEventPublisher, EventPublisher, EventPublisherExt, Message,
    MessageEnvelope, NullEventPublisher,
};
pub use logging::{init_structured_logging, ConsumerErrorLogger, NullErrorLogger, TracingErrorLogger};
pub use registry::{Consumer, ConsumerDescriptor, ConsumerRegistration, DefaultConsumerRegistry};
pub use resolver::{
    ApplicationLifetime, Arguments, DependencyScope, DependencyScopeExt, ServiceContainer,
};
