use std::sync::Arc;

use proptest::prelude::*;
use storefront_events::constants::method_names;
use storefront_events::error::HandlerResult;
use storefront_events::events::{MessageEnvelope, TypeKey};
use storefront_events::registry::ConsumerRegistration;
use storefront_events::resolver::Arguments;

use super::fixtures::{
    NewsletterSubscribed, NotificationConsumer, OrderConsumer, OrderEvent, OrderPlaced,
    OrderRefunded,
};

/// Message type a generated consumer binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingTarget {
    OrderPlaced,
    OrderRefunded,
    AnyOrderEvent,
    NewsletterSubscribed,
}

impl BindingTarget {
    pub fn type_key(self) -> TypeKey {
        match self {
            Self::OrderPlaced => TypeKey::of::<OrderPlaced>(),
            Self::OrderRefunded => TypeKey::of::<OrderRefunded>(),
            Self::AnyOrderEvent => TypeKey::of::<dyn OrderEvent>(),
            Self::NewsletterSubscribed => TypeKey::of::<NewsletterSubscribed>(),
        }
    }
}

/// Published message kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishedMessage {
    Placed(u64),
    Refunded(u64, u64),
    Newsletter(String),
}

impl PublishedMessage {
    pub fn envelope(&self) -> MessageEnvelope {
        match self {
            Self::Placed(order_id) => MessageEnvelope::new(OrderPlaced {
                order_id: *order_id,
            }),
            Self::Refunded(order_id, amount_cents) => MessageEnvelope::new(OrderRefunded {
                order_id: *order_id,
                amount_cents: *amount_cents,
            }),
            Self::Newsletter(email) => MessageEnvelope::new(NewsletterSubscribed {
                email: email.clone(),
            }),
        }
    }
}

/// Shape of one generated consumer binding
#[derive(Debug, Clone)]
pub struct BindingPlan {
    pub target: BindingTarget,
    pub is_async: bool,
    pub fire_forget: bool,
    pub method_index: usize,
    pub on_notification_consumer: bool,
}

impl BindingPlan {
    fn method_name(&self) -> &'static str {
        if self.is_async {
            method_names::ASYNC[self.method_index]
        } else {
            method_names::SYNC[self.method_index]
        }
    }

    pub fn registration(&self) -> ConsumerRegistration {
        let registration = match (self.on_notification_consumer, self.is_async) {
            (false, false) => sync_binding::<OrderConsumer>(self.target, self.method_name()),
            (true, false) => sync_binding::<NotificationConsumer>(self.target, self.method_name()),
            (false, true) => async_binding::<OrderConsumer>(self.target, self.method_name()),
            (true, true) => async_binding::<NotificationConsumer>(self.target, self.method_name()),
        };

        if self.fire_forget {
            registration.fire_and_forget()
        } else {
            registration
        }
    }
}

fn sync_binding<C: storefront_events::registry::Consumer>(
    target: BindingTarget,
    method: &'static str,
) -> ConsumerRegistration {
    match target {
        BindingTarget::OrderPlaced => {
            ConsumerRegistration::sync(method, |_: &C, _: Arc<OrderPlaced>, _: &Arguments| Ok(()))
        }
        BindingTarget::OrderRefunded => {
            ConsumerRegistration::sync(method, |_: &C, _: Arc<OrderRefunded>, _: &Arguments| Ok(()))
        }
        BindingTarget::AnyOrderEvent => ConsumerRegistration::sync(
            method,
            |_: &C, _: Arc<dyn OrderEvent>, _: &Arguments| Ok(()),
        ),
        BindingTarget::NewsletterSubscribed => ConsumerRegistration::sync(
            method,
            |_: &C, _: Arc<NewsletterSubscribed>, _: &Arguments| Ok(()),
        ),
    }
}

fn async_binding<C: storefront_events::registry::Consumer>(
    target: BindingTarget,
    method: &'static str,
) -> ConsumerRegistration {
    match target {
        BindingTarget::OrderPlaced => ConsumerRegistration::asynchronous(
            method,
            |_: Arc<C>, _: Arc<OrderPlaced>, _: Arguments| async { HandlerResult::Ok(()) },
        ),
        BindingTarget::OrderRefunded => ConsumerRegistration::asynchronous(
            method,
            |_: Arc<C>, _: Arc<OrderRefunded>, _: Arguments| async { HandlerResult::Ok(()) },
        ),
        BindingTarget::AnyOrderEvent => ConsumerRegistration::asynchronous(
            method,
            |_: Arc<C>, _: Arc<dyn OrderEvent>, _: Arguments| async { HandlerResult::Ok(()) },
        ),
        BindingTarget::NewsletterSubscribed => ConsumerRegistration::asynchronous(
            method,
            |_: Arc<C>, _: Arc<NewsletterSubscribed>, _: Arguments| async { HandlerResult::Ok(()) },
        ),
    }
}

/// Strategy for generating binding targets
pub fn binding_target_strategy() -> impl Strategy<Value = BindingTarget> {
    prop_oneof![
        Just(BindingTarget::OrderPlaced),
        Just(BindingTarget::OrderRefunded),
        Just(BindingTarget::AnyOrderEvent),
        Just(BindingTarget::NewsletterSubscribed),
    ]
}

/// Strategy for generating a single consumer binding
pub fn binding_plan_strategy() -> impl Strategy<Value = BindingPlan> {
    (
        binding_target_strategy(),
        any::<bool>(),
        any::<bool>(),
        0..method_names::SYNC.len(),
        any::<bool>(),
    )
        .prop_map(
            |(target, is_async, fire_forget, method_index, on_notification_consumer)| BindingPlan {
                target,
                is_async,
                fire_forget,
                method_index,
                on_notification_consumer,
            },
        )
}

/// Strategy for generating a registry's worth of bindings
pub fn binding_plans_strategy() -> impl Strategy<Value = Vec<BindingPlan>> {
    prop::collection::vec(binding_plan_strategy(), 0..24)
}

/// Strategy for generating published messages
pub fn published_message_strategy() -> impl Strategy<Value = PublishedMessage> {
    prop_oneof![
        any::<u64>().prop_map(PublishedMessage::Placed),
        (any::<u64>(), 1u64..1_000_000).prop_map(|(id, cents)| PublishedMessage::Refunded(id, cents)),
        "[a-z]{1,12}@example\\.com".prop_map(PublishedMessage::Newsletter),
    ]
}

/// Strategy for generating arbitrary method names, mostly invalid
pub fn method_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(method_names::HANDLE.to_string()),
        Just(method_names::HANDLE_ASYNC.to_string()),
        "[A-Z][a-zA-Z]{0,15}",
    ]
}
