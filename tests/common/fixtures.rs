use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use storefront_events::dispatch::ConsumerInvoker;
use storefront_events::logging::ConsumerErrorLogger;
use storefront_events::events::{Message, MessageEnvelope, MessageView};
use storefront_events::registry::{Consumer, ConsumerDescriptor, ConsumerRegistration};
use storefront_events::resolver::{
    ApplicationLifetime, DefaultConsumerResolver, DependencyScope, DependencyScopeExt,
    ServiceContainer, ServiceContainerBuilder,
};
use tokio::sync::oneshot;
use uuid::Uuid;

use super::recording_logger::RecordingLogger;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Behaviour shared by all order lifecycle messages
pub trait OrderEvent: Send + Sync {
    fn order_id(&self) -> u64;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlaced {
    pub order_id: u64,
}

impl OrderEvent for OrderPlaced {
    fn order_id(&self) -> u64 {
        self.order_id
    }
}

impl Message for OrderPlaced {
    fn supertypes(self: Arc<Self>) -> Vec<MessageView> {
        vec![MessageView::new::<dyn OrderEvent>(self)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRefunded {
    pub order_id: u64,
    pub amount_cents: u64,
}

impl OrderEvent for OrderRefunded {
    fn order_id(&self) -> u64 {
        self.order_id
    }
}

impl Message for OrderRefunded {
    fn supertypes(self: Arc<Self>) -> Vec<MessageView> {
        vec![MessageView::new::<dyn OrderEvent>(self)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsletterSubscribed {
    pub email: String,
}

impl Message for NewsletterSubscribed {}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct InvalidOperationError(pub String);

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// Append-only record of what consumers did
#[derive(Debug, Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().iter().any(|e| e == entry)
    }
}

/// Scoped service standing in for a database unit of work
#[derive(Debug)]
pub struct UnitOfWork {
    pub id: Uuid,
    disposed: Arc<AtomicUsize>,
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Blocks a synchronous consumer until the test releases it
#[derive(Debug, Default)]
pub struct Gate {
    receiver: Mutex<Option<oneshot::Receiver<()>>>,
}

impl Gate {
    pub fn new() -> (Self, oneshot::Sender<()>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                receiver: Mutex::new(Some(receiver)),
            },
            sender,
        )
    }

    /// Must only be called off the async runtime (blocking pool)
    pub fn wait_blocking(&self) {
        let receiver = self.receiver.lock().take();
        if let Some(receiver) = receiver {
            let _ = receiver.blocking_recv();
        }
    }
}

// ---------------------------------------------------------------------------
// Consumers
// ---------------------------------------------------------------------------

pub struct OrderConsumer {
    pub journal: Arc<Journal>,
}

impl Consumer for OrderConsumer {}

pub struct NotificationConsumer {
    pub journal: Arc<Journal>,
}

impl Consumer for NotificationConsumer {}

/// Registered in no container
pub struct UnregisteredConsumer;

impl Consumer for UnregisteredConsumer {}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Journal, unit of work and both consumers
pub fn base_services(journal: Arc<Journal>, disposed: Arc<AtomicUsize>) -> ServiceContainerBuilder {
    ServiceContainer::builder()
        .add_singleton_arc(journal)
        .add_scoped(move |_| {
            Ok(UnitOfWork {
                id: Uuid::new_v4(),
                disposed: Arc::clone(&disposed),
            })
        })
        .add_transient(|scope| {
            Ok(OrderConsumer {
                journal: scope.resolve::<Journal>()?,
            })
        })
        .add_transient(|scope| {
            Ok(NotificationConsumer {
                journal: scope.resolve::<Journal>()?,
            })
        })
}

pub fn descriptor(registration: ConsumerRegistration) -> Arc<ConsumerDescriptor> {
    Arc::new(
        registration
            .into_descriptor()
            .expect("test registration should be valid"),
    )
}

/// An invoker over [`base_services`] with a recording logger
pub struct Harness {
    pub journal: Arc<Journal>,
    pub disposed: Arc<AtomicUsize>,
    pub logger: Arc<RecordingLogger>,
    pub lifetime: ApplicationLifetime,
    pub container: ServiceContainer,
    pub invoker: ConsumerInvoker,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_services(|builder| builder)
    }

    pub fn with_services(
        extend: impl FnOnce(ServiceContainerBuilder) -> ServiceContainerBuilder,
    ) -> Self {
        let journal = Arc::new(Journal::default());
        let disposed = Arc::new(AtomicUsize::new(0));
        let container = extend(base_services(Arc::clone(&journal), Arc::clone(&disposed))).build();

        let lifetime = ApplicationLifetime::new();
        let logger = Arc::new(RecordingLogger::new());
        let error_logger: Arc<dyn ConsumerErrorLogger> = logger.clone();
        let invoker = ConsumerInvoker::new(
            Arc::new(DefaultConsumerResolver::new(lifetime.clone())),
            Arc::new(container.clone()),
        )
        .with_logger(error_logger);

        Self {
            journal,
            disposed,
            logger,
            lifetime,
            container,
            invoker,
        }
    }

    /// Resolve the consumer from `scope` and invoke it, as a publisher would
    pub async fn invoke(
        &self,
        descriptor: &Arc<ConsumerDescriptor>,
        envelope: &MessageEnvelope,
        scope: &dyn DependencyScope,
    ) -> storefront_events::Result<()> {
        let consumer = self.invoker.resolver().resolve(descriptor, scope)?;
        self.invoker.invoke(descriptor, consumer, envelope, scope).await
    }

    pub fn disposed_units_of_work(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}
