//! # Messages, Envelopes and Publishers
//!
//! ```text
//! Events Infrastructure
//! ├── Message / MessageView / MessageEnvelope  (type-erased published data)
//! ├── ConsumeContext<M>                        (typed envelope for consumers)
//! └── EventPublisher                           (dispatching and no-op publishers)
//! ```

pub mod context;
pub mod message;
pub mod publisher;

pub use context::ConsumeContext;
pub use message::{EnvelopeHeader, Message, MessageEnvelope, MessageView, TypeKey};
pub use publisher::{
    DispatchingEventPublisher, EventPublisher, EventPublisherExt, NullEventPublisher,
};
