//! # Consumer Registration
//!
//! Builds [`ConsumerDescriptor`]s from strongly-typed closures. The closure
//! signature decides the descriptor flags:
//!
//! - `sync` takes `Fn(&C, I, &Arguments) -> HandlerResult` and runs inline.
//! - `asynchronous` takes `Fn(Arc<C>, I, Arguments) -> impl Future` and is awaited.
//! - `I` is `Arc<M>` for the bare message or `ConsumeContext<M>` for the envelope.
//!
//! ```rust
//! use std::sync::Arc;
//! use storefront_events::events::{ConsumeContext, Message};
//! use storefront_events::registry::{Consumer, ConsumerRegistration, DefaultConsumerRegistry};
//! use storefront_events::resolver::Arguments;
//!
//! struct OrderPlaced { order_id: u64 }
//! impl Message for OrderPlaced {}
//!
//! struct Mailer;
//!
//! struct OrderNotifications;
//! impl Consumer for OrderNotifications {}
//!
//! # fn main() -> Result<(), storefront_events::EventsError> {
//! let mut registry = DefaultConsumerRegistry::new();
//! registry.register(
//!     ConsumerRegistration::asynchronous(
//!         "HandleEventAsync",
//!         |_consumer: Arc<OrderNotifications>, ctx: ConsumeContext<OrderPlaced>, args: Arguments| async move {
//!             let _mailer = args.service::<Mailer>(0);
//!             let _order_id = ctx.message().order_id;
//!             Ok(())
//!         },
//!     )
//!     .with_parameter::<Mailer>("mailer")
//!     .fire_and_forget(),
//! )?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::constants::method_names;
use crate::error::{EventsError, HandlerResult, Result};
use crate::events::{ConsumeContext, EnvelopeHeader, MessageView, TypeKey};
use crate::resolver::Arguments;

use super::descriptor::{
    is_primitive, Consumer, ConsumerDescriptor, ConsumerInstance, ConsumerMethod, Invocation,
    ParameterDescriptor, ParameterKind, PluginDescriptor,
};

/// First parameter of a consumer method: the bare message or its envelope
pub trait HandlerInput: Send + 'static {
    type Message: ?Sized + Send + Sync + 'static;

    const WITH_ENVELOPE: bool;

    fn from_delivery(message: Arc<Self::Message>, header: &EnvelopeHeader) -> Self;
}

impl<M: ?Sized + Send + Sync + 'static> HandlerInput for Arc<M> {
    type Message = M;

    const WITH_ENVELOPE: bool = false;

    fn from_delivery(message: Arc<M>, _header: &EnvelopeHeader) -> Self {
        message
    }
}

impl<M: ?Sized + Send + Sync + 'static> HandlerInput for ConsumeContext<M> {
    type Message = M;

    const WITH_ENVELOPE: bool = true;

    fn from_delivery(message: Arc<M>, header: &EnvelopeHeader) -> Self {
        ConsumeContext::new(message, header.clone())
    }
}

/// A consumer binding under construction
pub struct ConsumerRegistration {
    descriptor: ConsumerDescriptor,
}

impl ConsumerRegistration {
    /// Register a synchronous consumer method
    pub fn sync<C, I, F>(method_name: &'static str, handler: F) -> Self
    where
        C: Consumer,
        I: HandlerInput,
        F: Fn(&C, I, &Arguments) -> HandlerResult + Send + Sync + 'static,
    {
        let method: ConsumerMethod = Arc::new(
            move |consumer: ConsumerInstance,
                  view: &MessageView,
                  header: &EnvelopeHeader,
                  arguments: Arguments|
                  -> Result<Invocation> {
                let consumer = downcast_consumer::<C>(consumer)?;
                let message = view
                    .downcast::<I::Message>()
                    .ok_or_else(|| message_mismatch::<C, I::Message>(view.message_type()))?;
                let input = I::from_delivery(message, header);
                Ok(Invocation::Completed(handler(consumer.as_ref(), input, &arguments)))
            },
        );

        Self::build::<C, I>(method_name, false, method)
    }

    /// Register an asynchronous consumer method
    pub fn asynchronous<C, I, F, Fut>(method_name: &'static str, handler: F) -> Self
    where
        C: Consumer,
        I: HandlerInput,
        F: Fn(Arc<C>, I, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let method: ConsumerMethod = Arc::new(
            move |consumer: ConsumerInstance,
                  view: &MessageView,
                  header: &EnvelopeHeader,
                  arguments: Arguments|
                  -> Result<Invocation> {
                let consumer = downcast_consumer::<C>(consumer)?;
                let message = view
                    .downcast::<I::Message>()
                    .ok_or_else(|| message_mismatch::<C, I::Message>(view.message_type()))?;
                let input = I::from_delivery(message, header);
                Ok(Invocation::Pending(Box::pin(handler(consumer, input, arguments))))
            },
        );

        Self::build::<C, I>(method_name, true, method)
    }

    fn build<C: Consumer, I: HandlerInput>(
        method_name: &'static str,
        is_async: bool,
        method: ConsumerMethod,
    ) -> Self {
        let message_type = TypeKey::of::<I::Message>();
        let message_parameter_name = if I::WITH_ENVELOPE { "context" } else { "message" };

        Self {
            descriptor: ConsumerDescriptor {
                message_type,
                container_type: TypeKey::of::<C>(),
                method_name,
                method,
                message_parameter: ParameterDescriptor::new(
                    0,
                    message_parameter_name,
                    message_type,
                    ParameterKind::Message,
                ),
                parameters: Vec::new(),
                with_envelope: I::WITH_ENVELOPE,
                is_async,
                fire_forget: false,
                plugin: None,
            },
        }
    }

    /// Run this consumer detached from the publisher
    pub fn fire_and_forget(mut self) -> Self {
        self.descriptor.fire_forget = true;
        self
    }

    /// Declare the next extra parameter as a service resolved from the scope
    pub fn with_parameter<T: Send + Sync + 'static>(mut self, name: &'static str) -> Self {
        let parameter_type = TypeKey::of::<T>();
        let kind = if is_primitive(parameter_type.id()) {
            ParameterKind::Primitive
        } else {
            ParameterKind::Service
        };
        self.push_parameter(name, parameter_type, kind);
        self
    }

    /// Declare the next extra parameter as the application shutdown token
    pub fn with_cancellation(mut self, name: &'static str) -> Self {
        self.push_parameter(
            name,
            TypeKey::of::<tokio_util::sync::CancellationToken>(),
            ParameterKind::Cancellation,
        );
        self
    }

    /// Record which extension module contributed this consumer
    pub fn from_plugin(mut self, plugin: PluginDescriptor) -> Self {
        self.descriptor.plugin = Some(plugin);
        self
    }

    fn push_parameter(&mut self, name: &'static str, parameter_type: TypeKey, kind: ParameterKind) {
        let position = self.descriptor.parameters.len();
        self.descriptor
            .parameters
            .push(ParameterDescriptor::new(position, name, parameter_type, kind));
    }

    /// Validate and produce the descriptor
    pub fn into_descriptor(self) -> Result<ConsumerDescriptor> {
        let descriptor = self.descriptor;

        if !method_names::is_accepted(descriptor.method_name, descriptor.is_async) {
            let accepted = if descriptor.is_async {
                method_names::ASYNC
            } else {
                method_names::SYNC
            };
            return Err(EventsError::invalid_registration(
                descriptor.identity(),
                format!(
                    "method name '{}' is not one of {}",
                    descriptor.method_name,
                    accepted.join(", ")
                ),
            ));
        }

        Ok(descriptor)
    }
}

fn downcast_consumer<C: Consumer>(consumer: ConsumerInstance) -> Result<Arc<C>> {
    consumer.downcast::<C>().map_err(|_| {
        EventsError::consumer_resolution(
            TypeKey::of::<C>().to_string(),
            "resolved instance has a different type",
        )
    })
}

fn message_mismatch<C: Consumer, M: ?Sized + 'static>(actual: TypeKey) -> EventsError {
    EventsError::MessageTypeMismatch {
        consumer: TypeKey::of::<C>().to_string(),
        expected: TypeKey::of::<M>().to_string(),
        actual: actual.to_string(),
    }
}
