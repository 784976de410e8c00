//! # Consumer Registry
//!
//! Maps message types to the consumer descriptors that accept them.
//!
//! ## Matching Rules
//!
//! - A descriptor matches when its message type is one of the envelope's views:
//!   the concrete message type or any supertype the message declares.
//! - Results follow the envelope's view order, then registration order, so the
//!   same message type always yields the same sequence.
//!
//! ## Concurrency
//!
//! Registration takes `&mut self`. Once populated, the registry is shared as
//! `Arc<dyn ConsumerRegistry>` and only read, so lookups need no locking.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::events::{MessageEnvelope, TypeKey};

use super::descriptor::ConsumerDescriptor;
use super::registration::ConsumerRegistration;

/// Lookup contract used by publishers
pub trait ConsumerRegistry: Send + Sync {
    /// All descriptors whose message type accepts the enveloped message
    fn get_consumers(&self, envelope: &MessageEnvelope) -> Vec<Arc<ConsumerDescriptor>>;
}

/// In-memory registry populated through explicit registrations
#[derive(Default)]
pub struct DefaultConsumerRegistry {
    by_message_type: HashMap<TypeId, Vec<Arc<ConsumerDescriptor>>>,
    descriptor_count: usize,
}

impl DefaultConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a consumer binding
    pub fn register(&mut self, registration: ConsumerRegistration) -> Result<Arc<ConsumerDescriptor>> {
        let descriptor = Arc::new(registration.into_descriptor()?);

        debug!(
            consumer = %descriptor.identity(),
            mode = %descriptor.execution_mode(),
            parameters = descriptor.parameters().len(),
            plugin = descriptor.plugin().map(|p| p.system_name.as_str()),
            "Registered consumer"
        );

        self.by_message_type
            .entry(descriptor.message_type().id())
            .or_default()
            .push(Arc::clone(&descriptor));
        self.descriptor_count += 1;

        Ok(descriptor)
    }

    /// Register several bindings, stopping at the first invalid one
    pub fn register_all(
        &mut self,
        registrations: impl IntoIterator<Item = ConsumerRegistration>,
    ) -> Result<()> {
        for registration in registrations {
            self.register(registration)?;
        }
        Ok(())
    }

    /// Descriptors registered for exactly this message type
    pub fn consumers_of(&self, message_type: TypeKey) -> &[Arc<ConsumerDescriptor>] {
        self.by_message_type
            .get(&message_type.id())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.descriptor_count
    }

    pub fn is_empty(&self) -> bool {
        self.descriptor_count == 0
    }

    pub fn message_type_count(&self) -> usize {
        self.by_message_type.len()
    }

    /// Freeze the registry for shared read-only use
    pub fn into_shared(self) -> Arc<dyn ConsumerRegistry> {
        info!(
            consumers = self.descriptor_count,
            message_types = self.by_message_type.len(),
            "Consumer registry populated"
        );
        Arc::new(self)
    }
}

impl ConsumerRegistry for DefaultConsumerRegistry {
    fn get_consumers(&self, envelope: &MessageEnvelope) -> Vec<Arc<ConsumerDescriptor>> {
        envelope
            .message_types()
            .flat_map(|message_type| self.consumers_of(message_type).iter().cloned())
            .collect()
    }
}

impl std::fmt::Debug for DefaultConsumerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultConsumerRegistry")
            .field("consumers", &self.descriptor_count)
            .field("message_types", &self.by_message_type.len())
            .finish()
    }
}
