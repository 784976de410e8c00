//! # Messages and Envelopes
//!
//! Messages are plain data types published through the event system. The
//! dispatcher never sees them as concrete types; it moves them around as
//! [`MessageView`]s (a type-erased `Arc<M>` tagged with its [`TypeKey`]) bundled
//! into a [`MessageEnvelope`].
//!
//! A message can also be consumed under broader types, typically trait objects
//! it implements. It declares those by overriding [`Message::supertypes`]:
//!
//! ```rust
//! use std::sync::Arc;
//! use storefront_events::events::{Message, MessageView};
//!
//! pub trait OrderEvent: Send + Sync {
//!     fn order_id(&self) -> u64;
//! }
//!
//! pub struct OrderPlaced {
//!     pub order_id: u64,
//! }
//!
//! impl OrderEvent for OrderPlaced {
//!     fn order_id(&self) -> u64 {
//!         self.order_id
//!     }
//! }
//!
//! impl Message for OrderPlaced {
//!     fn supertypes(self: Arc<Self>) -> Vec<MessageView> {
//!         vec![MessageView::new::<dyn OrderEvent>(self)]
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Runtime identity of a Rust type, with a printable name
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without module paths, e.g. `OrderPlaced` or `dyn OrderEvent`
    pub fn short_name(&self) -> String {
        let mut short = String::with_capacity(self.name.len());
        let mut segment = String::new();
        for ch in self.name.chars() {
            match ch {
                ':' => segment.clear(),
                '<' | '>' | ',' | ' ' | '(' | ')' | '&' | '[' | ']' => {
                    short.push_str(&segment);
                    segment.clear();
                    short.push(ch);
                }
                _ => segment.push(ch),
            }
        }
        short.push_str(&segment);
        short
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

/// A publishable message
pub trait Message: Send + Sync + 'static {
    /// Additional views under which consumers of broader types receive this message
    fn supertypes(self: Arc<Self>) -> Vec<MessageView> {
        Vec::new()
    }
}

/// A type-erased shared message tagged with the type it is viewed as
#[derive(Clone)]
pub struct MessageView {
    message_type: TypeKey,
    value: Arc<dyn Any + Send + Sync>,
}

impl MessageView {
    pub fn new<M: ?Sized + Send + Sync + 'static>(message: Arc<M>) -> Self {
        Self {
            message_type: TypeKey::of::<M>(),
            value: Arc::new(message),
        }
    }

    pub fn message_type(&self) -> TypeKey {
        self.message_type
    }

    /// Recover the typed message; `None` if `M` is not the viewed type
    pub fn downcast<M: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<M>> {
        self.value.downcast_ref::<Arc<M>>().cloned()
    }
}

impl fmt::Debug for MessageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageView")
            .field("message_type", &self.message_type)
            .finish()
    }
}

/// Per-publish metadata shared by every consumer of one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub message_id: Uuid,
    pub published_at: DateTime<Utc>,
}

impl EnvelopeHeader {
    pub fn new() -> Self {
        Self {
            message_id: Uuid::new_v4(),
            published_at: Utc::now(),
        }
    }
}

impl Default for EnvelopeHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// A published message with all of its views, handed from publisher to invoker
#[derive(Clone, Debug)]
pub struct MessageEnvelope {
    header: EnvelopeHeader,
    views: Vec<MessageView>,
}

impl MessageEnvelope {
    /// Wrap a message; the concrete type comes first, declared supertypes follow
    pub fn new<M: Message>(message: M) -> Self {
        Self::from_arc(Arc::new(message))
    }

    pub fn from_arc<M: Message>(message: Arc<M>) -> Self {
        let mut views = vec![MessageView::new(Arc::clone(&message))];
        for view in message.supertypes() {
            if !views
                .iter()
                .any(|existing| existing.message_type == view.message_type)
            {
                views.push(view);
            }
        }

        Self {
            header: EnvelopeHeader::new(),
            views,
        }
    }

    pub fn header(&self) -> &EnvelopeHeader {
        &self.header
    }

    pub fn message_id(&self) -> Uuid {
        self.header.message_id
    }

    /// The runtime (concrete) type of the message
    pub fn message_type(&self) -> TypeKey {
        self.views[0].message_type
    }

    /// Every type this message can be consumed as, in lookup order
    pub fn message_types(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.views.iter().map(MessageView::message_type)
    }

    pub fn views(&self) -> &[MessageView] {
        &self.views
    }

    pub fn view_for(&self, message_type: TypeKey) -> Option<&MessageView> {
        self.views
            .iter()
            .find(|view| view.message_type == message_type)
    }

    /// Whether a consumer of `message_type` accepts this message
    pub fn is_assignable_to(&self, message_type: TypeKey) -> bool {
        self.view_for(message_type).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait CustomerEvent: Send + Sync {
        fn customer_id(&self) -> u64;
    }

    #[derive(Debug)]
    struct CustomerRegistered {
        customer_id: u64,
    }

    impl CustomerEvent for CustomerRegistered {
        fn customer_id(&self) -> u64 {
            self.customer_id
        }
    }

    impl Message for CustomerRegistered {
        fn supertypes(self: Arc<Self>) -> Vec<MessageView> {
            vec![
                MessageView::new::<dyn CustomerEvent>(Arc::clone(&self) as Arc<dyn CustomerEvent>),
                // Declaring the concrete type again is ignored
                MessageView::new(self),
            ]
        }
    }

    struct CacheCleared;

    impl Message for CacheCleared {}

    #[test]
    fn test_envelope_orders_concrete_type_first() {
        let envelope = MessageEnvelope::new(CustomerRegistered { customer_id: 7 });

        let types: Vec<TypeKey> = envelope.message_types().collect();
        assert_eq!(types.len(), 2);
        assert_eq!(types[0], TypeKey::of::<CustomerRegistered>());
        assert_eq!(types[1], TypeKey::of::<dyn CustomerEvent>());
        assert_eq!(envelope.message_type(), TypeKey::of::<CustomerRegistered>());
    }

    #[test]
    fn test_views_downcast_to_their_own_type_only() {
        let envelope = MessageEnvelope::new(CustomerRegistered { customer_id: 7 });

        let concrete = envelope
            .view_for(TypeKey::of::<CustomerRegistered>())
            .and_then(MessageView::downcast::<CustomerRegistered>)
            .unwrap();
        assert_eq!(concrete.customer_id, 7);

        let as_trait = envelope
            .view_for(TypeKey::of::<dyn CustomerEvent>())
            .and_then(MessageView::downcast::<dyn CustomerEvent>)
            .unwrap();
        assert_eq!(as_trait.customer_id(), 7);

        assert!(envelope.views()[0].downcast::<CacheCleared>().is_none());
    }

    #[test]
    fn test_assignability() {
        let envelope = MessageEnvelope::new(CacheCleared);
        assert!(envelope.is_assignable_to(TypeKey::of::<CacheCleared>()));
        assert!(!envelope.is_assignable_to(TypeKey::of::<dyn CustomerEvent>()));
    }

    #[test]
    fn test_short_names() {
        assert_eq!(TypeKey::of::<CacheCleared>().short_name(), "CacheCleared");
        assert_eq!(
            TypeKey::of::<dyn CustomerEvent>().to_string(),
            "dyn CustomerEvent"
        );
        assert_eq!(
            TypeKey::of::<Option<String>>().short_name(),
            "Option<String>"
        );
    }
}
