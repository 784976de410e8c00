//! # Consumer Invoker
//!
//! Executes one consumer for one message under the policy its descriptor
//! encodes:
//!
//! | mode           | where it runs                          | failure        |
//! |----------------|----------------------------------------|----------------|
//! | sync-awaited   | inline on the publishing task          | logged, raised |
//! | async-awaited  | its own tokio task, awaited            | logged, raised |
//! | sync-detached  | blocking pool, private scope           | logged only    |
//! | async-detached | tracked tokio task, private scope      | logged only    |
//!
//! Resolution failures (consumer or parameters) always surface to the caller,
//! including for detached modes: their private scope is opened and bound
//! before the background work is spawned.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, debug_span, Instrument};

use crate::error::{EventsError, HandlerError, HandlerResult, Result};
use crate::events::{EnvelopeHeader, MessageEnvelope, MessageView};
use crate::logging::{ConsumerErrorLogger, NullErrorLogger};
use crate::registry::{ConsumerDescriptor, ConsumerInstance, ExecutionMode, Invocation};
use crate::resolver::{Arguments, ConsumerResolver, DependencyScope, ScopeFactory};

/// Dispatch core shared by all publishers
pub struct ConsumerInvoker {
    resolver: Arc<dyn ConsumerResolver>,
    scope_factory: Arc<dyn ScopeFactory>,
    logger: Arc<dyn ConsumerErrorLogger>,
    detached_limit: Option<Arc<Semaphore>>,
    tracker: TaskTracker,
    active_drains: Mutex<usize>,
}

impl ConsumerInvoker {
    /// Invoker with a no-op error logger and no detached concurrency limit
    pub fn new(resolver: Arc<dyn ConsumerResolver>, scope_factory: Arc<dyn ScopeFactory>) -> Self {
        Self {
            resolver,
            scope_factory,
            logger: Arc::new(NullErrorLogger),
            detached_limit: None,
            tracker: TaskTracker::new(),
            active_drains: Mutex::new(0),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConsumerErrorLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Cap concurrently running detached consumers; `None` removes the cap
    pub fn with_detached_limit(mut self, limit: Option<usize>) -> Self {
        self.detached_limit = limit.map(|permits| Arc::new(Semaphore::new(permits)));
        self
    }

    pub fn resolver(&self) -> &Arc<dyn ConsumerResolver> {
        &self.resolver
    }

    /// Detached consumers spawned and not yet finished
    pub fn detached_in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Run `descriptor` against the enveloped message
    ///
    /// `consumer` and `scope` are the caller's; awaited modes use them
    /// directly. Detached modes open a private scope and resolve afresh.
    pub async fn invoke(
        &self,
        descriptor: &Arc<ConsumerDescriptor>,
        consumer: ConsumerInstance,
        envelope: &MessageEnvelope,
        scope: &dyn DependencyScope,
    ) -> Result<()> {
        let view = envelope
            .view_for(descriptor.message_type())
            .cloned()
            .ok_or_else(|| EventsError::MessageTypeMismatch {
                consumer: descriptor.identity(),
                expected: descriptor.message_type().to_string(),
                actual: envelope.message_type().to_string(),
            })?;

        match descriptor.execution_mode() {
            ExecutionMode::SyncAwaited => {
                let arguments = self.resolver.resolve_arguments(descriptor, scope)?;
                let outcome = call(descriptor, consumer, &view, envelope.header(), arguments)?;
                let result = outcome.complete().await;
                apply_failure_policy(self.logger.as_ref(), descriptor, result)
            }
            ExecutionMode::AsyncAwaited => {
                let arguments = self.resolver.resolve_arguments(descriptor, scope)?;
                let result = match call(descriptor, consumer, &view, envelope.header(), arguments)? {
                    Invocation::Completed(result) => result,
                    Invocation::Pending(work) => tokio::spawn(work)
                        .await
                        .unwrap_or_else(|join_error| Err(HandlerError::from(join_error))),
                };
                apply_failure_policy(self.logger.as_ref(), descriptor, result)
            }
            ExecutionMode::SyncDetached | ExecutionMode::AsyncDetached => {
                self.dispatch_detached(descriptor, envelope.header().clone(), view)
            }
        }
    }

    fn dispatch_detached(
        &self,
        descriptor: &Arc<ConsumerDescriptor>,
        header: EnvelopeHeader,
        view: MessageView,
    ) -> Result<()> {
        let scope = self.scope_factory.create_scope();
        let consumer = self.resolver.resolve(descriptor, scope.as_ref())?;
        let arguments = self.resolver.resolve_arguments(descriptor, scope.as_ref())?;

        let descriptor = Arc::clone(descriptor);
        let logger = Arc::clone(&self.logger);
        let limiter = self.detached_limit.clone();
        let span = debug_span!(
            "detached_consumer",
            consumer = %descriptor.identity(),
            message_id = %header.message_id,
            scope_id = %scope.scope_id()
        );

        debug!(
            consumer = %descriptor.identity(),
            mode = %descriptor.execution_mode(),
            "Scheduling detached consumer"
        );

        self.tracker.spawn(
            async move {
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };

                let result = if descriptor.is_async() {
                    run_detached_async(&descriptor, consumer, &view, &header, arguments).await
                } else {
                    run_detached_sync(&descriptor, consumer, view, header, arguments).await
                };

                // Fire-and-forget: the policy only logs
                let _ = apply_failure_policy(logger.as_ref(), &descriptor, result);

                drop(scope);
                debug!("Detached consumer finished");
            }
            .instrument(span),
        );

        Ok(())
    }

    /// Wait until every detached consumer spawned so far has finished
    ///
    /// Safe to call from several tasks at once; the tracker reopens only when
    /// the last concurrent drain finishes or is dropped.
    pub async fn wait_for_detached(&self) {
        let _drain = Drain::begin(&self.tracker, &self.active_drains);
        self.tracker.wait().await;
    }

    /// Whether a [`wait_for_detached`](Self::wait_for_detached) call is in progress
    pub fn is_draining(&self) -> bool {
        self.tracker.is_closed()
    }
}

/// Keeps the tracker closed while at least one drain is waiting
struct Drain<'a> {
    tracker: &'a TaskTracker,
    active: &'a Mutex<usize>,
}

impl<'a> Drain<'a> {
    fn begin(tracker: &'a TaskTracker, active: &'a Mutex<usize>) -> Self {
        let mut count = active.lock();
        *count += 1;
        tracker.close();
        Self { tracker, active }
    }
}

impl Drop for Drain<'_> {
    fn drop(&mut self) {
        let mut count = self.active.lock();
        *count -= 1;
        if *count == 0 {
            self.tracker.reopen();
        }
    }
}

impl std::fmt::Debug for ConsumerInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerInvoker")
            .field(
                "detached_limit",
                &self.detached_limit.as_ref().map(|s| s.available_permits()),
            )
            .field("detached_in_flight", &self.tracker.len())
            .finish()
    }
}

/// Call the erased method, turning a panic into a handler failure
fn call(
    descriptor: &ConsumerDescriptor,
    consumer: ConsumerInstance,
    view: &MessageView,
    header: &EnvelopeHeader,
    arguments: Arguments,
) -> Result<Invocation> {
    catch_unwind(AssertUnwindSafe(|| {
        (descriptor.method())(consumer, view, header, arguments)
    }))
    .unwrap_or_else(|payload| Ok(Invocation::Completed(Err(HandlerError::from_panic(payload)))))
}

async fn run_detached_async(
    descriptor: &ConsumerDescriptor,
    consumer: ConsumerInstance,
    view: &MessageView,
    header: &EnvelopeHeader,
    arguments: Arguments,
) -> HandlerResult {
    match call(descriptor, consumer, view, header, arguments) {
        Ok(invocation) => AssertUnwindSafe(invocation.complete())
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload))),
        Err(error) => Err(HandlerError::new(error)),
    }
}

async fn run_detached_sync(
    descriptor: &Arc<ConsumerDescriptor>,
    consumer: ConsumerInstance,
    view: MessageView,
    header: EnvelopeHeader,
    arguments: Arguments,
) -> HandlerResult {
    let blocking = Arc::clone(descriptor);
    let joined = tokio::task::spawn_blocking(move || {
        call(&blocking, consumer, &view, &header, arguments)
    })
    .await;

    match joined {
        Ok(Ok(invocation)) => invocation.complete().await,
        Ok(Err(error)) => Err(HandlerError::new(error)),
        Err(join_error) => Err(HandlerError::from(join_error)),
    }
}

/// Log a failure against the descriptor and decide whether it propagates
///
/// Composite failures are logged once per inner error; propagation is decided
/// on the composite as a whole. Only awaited consumers propagate.
pub(crate) fn apply_failure_policy(
    logger: &dyn ConsumerErrorLogger,
    descriptor: &ConsumerDescriptor,
    result: HandlerResult,
) -> Result<()> {
    let error = match result {
        Ok(()) => return Ok(()),
        Err(error) => error,
    };

    let identity = descriptor.identity();
    if error.is_aggregate() && !error.inner_errors().is_empty() {
        for inner in error.inner_errors() {
            logger.error(&identity, Some(inner));
        }
    } else {
        logger.error(&identity, Some(&error));
    }

    if descriptor.fire_forget() {
        Ok(())
    } else {
        Err(EventsError::Handler {
            consumer: identity,
            source: error,
        })
    }
}
