use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::message::EnvelopeHeader;

/// Typed envelope handed to consumers that ask for context instead of the bare message
pub struct ConsumeContext<M: ?Sized> {
    message: Arc<M>,
    header: EnvelopeHeader,
}

impl<M: ?Sized> ConsumeContext<M> {
    pub fn new(message: Arc<M>, header: EnvelopeHeader) -> Self {
        Self { message, header }
    }

    pub fn message(&self) -> &M {
        &self.message
    }

    /// Shared handle to the message, e.g. for moving it into spawned work
    pub fn message_arc(&self) -> Arc<M> {
        Arc::clone(&self.message)
    }

    pub fn message_id(&self) -> Uuid {
        self.header.message_id
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.header.published_at
    }
}

impl<M: ?Sized> Clone for ConsumeContext<M> {
    fn clone(&self) -> Self {
        Self {
            message: Arc::clone(&self.message),
            header: self.header.clone(),
        }
    }
}

impl<M: ?Sized> fmt::Debug for ConsumeContext<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumeContext")
            .field("message_type", &std::any::type_name::<M>())
            .field("message_id", &self.header.message_id)
            .field("published_at", &self.header.published_at)
            .finish()
    }
}
