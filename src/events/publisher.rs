//! # Event Publishers
//!
//! Business code announces messages through [`EventPublisher`]. The
//! [`DispatchingEventPublisher`] looks up matching consumers and hands each to
//! the [`ConsumerInvoker`]; the [`NullEventPublisher`] accepts everything and
//! does nothing, for hosts where the event system is disabled.
//!
//! ```rust,no_run
//! use storefront_events::events::{EventPublisher, EventPublisherExt, Message};
//!
//! struct CartAbandoned { cart_id: u64 }
//! impl Message for CartAbandoned {}
//!
//! async fn abandon(publisher: &dyn EventPublisher) -> storefront_events::Result<()> {
//!     publisher.publish(CartAbandoned { cart_id: 9 }).await
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::dispatch::stats::StatsRecorder;
use crate::dispatch::{ConsumerInvoker, DispatchStats};
use crate::error::{EventsError, Result};
use crate::registry::ConsumerRegistry;
use crate::resolver::{DependencyScope, ScopeFactory};

use super::message::{Message, MessageEnvelope};

/// Entry point for announcing messages
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Deliver an envelope to every matching consumer
    ///
    /// Awaited consumers resolve from `scope`; a fresh scope is opened when
    /// none is given. Returns the first propagated consumer failure, after all
    /// consumers have run.
    async fn publish_envelope(
        &self,
        envelope: MessageEnvelope,
        scope: Option<&dyn DependencyScope>,
    ) -> Result<()>;
}

/// Typed publishing helpers available on every [`EventPublisher`]
#[async_trait]
pub trait EventPublisherExt: EventPublisher {
    async fn publish<M: Message>(&self, message: M) -> Result<()> {
        self.publish_envelope(MessageEnvelope::new(message), None)
            .await
    }

    /// Publish using the caller's unit-of-work scope
    async fn publish_in_scope<M: Message>(
        &self,
        message: M,
        scope: &dyn DependencyScope,
    ) -> Result<()> {
        self.publish_envelope(MessageEnvelope::new(message), Some(scope))
            .await
    }
}

impl<P: EventPublisher + ?Sized> EventPublisherExt for P {}

/// Publisher that dispatches through a registry and an invoker
pub struct DispatchingEventPublisher {
    registry: Arc<dyn ConsumerRegistry>,
    invoker: Arc<ConsumerInvoker>,
    scope_factory: Arc<dyn ScopeFactory>,
    stats: StatsRecorder,
}

impl DispatchingEventPublisher {
    pub fn new(
        registry: Arc<dyn ConsumerRegistry>,
        invoker: Arc<ConsumerInvoker>,
        scope_factory: Arc<dyn ScopeFactory>,
    ) -> Self {
        Self {
            registry,
            invoker,
            scope_factory,
            stats: StatsRecorder::default(),
        }
    }

    pub fn invoker(&self) -> &Arc<ConsumerInvoker> {
        &self.invoker
    }

    pub fn statistics(&self) -> DispatchStats {
        self.stats.snapshot()
    }

    async fn dispatch(&self, envelope: &MessageEnvelope, scope: &dyn DependencyScope) -> Result<()> {
        let descriptors = self.registry.get_consumers(envelope);
        self.stats.record(|stats| stats.messages_published += 1);

        if descriptors.is_empty() {
            trace!(
                message_type = %envelope.message_type(),
                message_id = %envelope.message_id(),
                "No consumers for message"
            );
            return Ok(());
        }

        debug!(
            message_type = %envelope.message_type(),
            message_id = %envelope.message_id(),
            consumers = descriptors.len(),
            scope_id = %scope.scope_id(),
            "Publishing message"
        );

        let mut first_failure: Option<EventsError> = None;

        for descriptor in &descriptors {
            let consumer = match self.invoker.resolver().resolve(descriptor, scope) {
                Ok(consumer) => consumer,
                Err(error) => {
                    self.stats.record(|stats| stats.resolution_failures += 1);
                    return Err(error);
                }
            };

            let outcome = self.invoker.invoke(descriptor, consumer, envelope, scope).await;
            let detached = descriptor.execution_mode().is_detached();

            match outcome {
                Ok(()) => self.stats.record(|stats| {
                    stats.consumers_invoked += 1;
                    if detached {
                        stats.detached_dispatches += 1;
                    }
                }),
                Err(error) if error.handler_error().is_some() => {
                    self.stats.record(|stats| {
                        stats.consumers_invoked += 1;
                        stats.failures_propagated += 1;
                    });
                    // Later consumers still run; the first failure is reported
                    first_failure.get_or_insert(error);
                }
                Err(error) => {
                    self.stats.record(|stats| stats.resolution_failures += 1);
                    return Err(error);
                }
            }
        }

        match first_failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EventPublisher for DispatchingEventPublisher {
    async fn publish_envelope(
        &self,
        envelope: MessageEnvelope,
        scope: Option<&dyn DependencyScope>,
    ) -> Result<()> {
        match scope {
            Some(scope) => self.dispatch(&envelope, scope).await,
            None => {
                let scope = self.scope_factory.create_scope();
                self.dispatch(&envelope, scope.as_ref()).await
            }
        }
    }
}

impl std::fmt::Debug for DispatchingEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchingEventPublisher")
            .field("invoker", &self.invoker)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

/// Publisher that accepts any message and does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventPublisher;

#[async_trait]
impl EventPublisher for NullEventPublisher {
    async fn publish_envelope(
        &self,
        envelope: MessageEnvelope,
        _scope: Option<&dyn DependencyScope>,
    ) -> Result<()> {
        trace!(
            message_type = %envelope.message_type(),
            "Event system disabled - dropping message"
        );
        Ok(())
    }
}
