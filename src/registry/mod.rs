//! # Consumer Registry Infrastructure
//!
//! Descriptors, typed registration and message-type lookup.
//!
//! ## Architecture
//!
//! ```text
//! Registry Infrastructure
//! ├── ConsumerRegistration   (typed closure -> descriptor)
//! ├── ConsumerDescriptor     (message type, consumer type, method, mode flags)
//! └── ConsumerRegistry       (message envelope -> matching descriptors)
//! ```

pub mod consumer_registry;
pub mod descriptor;
pub mod registration;

pub use consumer_registry::{ConsumerRegistry, DefaultConsumerRegistry};
pub use descriptor::{
    Consumer, ConsumerDescriptor, ConsumerInstance, ConsumerMethod, ExecutionMode, Invocation,
    ParameterDescriptor, ParameterKind, PluginDescriptor,
};
pub use registration::{ConsumerRegistration, HandlerInput};
