//! # Dependency Scopes
//!
//! A minimal service container with three lifetimes:
//!
//! - **Singleton**: one shared instance for the whole container
//! - **Scoped**: one instance per [`ServiceScope`], dropped with the scope
//! - **Transient**: a new instance on every resolution
//!
//! Scopes are cheap. Publishers use the caller's scope for awaited consumers
//! and open a private one for each detached consumer.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EventsError, Result};
use crate::events::TypeKey;

/// A resolved service, erased until the consumer downcasts it
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

/// Something that can hand out service instances for a unit of work
pub trait DependencyScope: Send + Sync {
    fn resolve_service(&self, service_type: TypeKey) -> Result<ServiceInstance>;

    fn scope_id(&self) -> Uuid;
}

/// Typed resolution on top of [`DependencyScope`]
pub trait DependencyScopeExt: DependencyScope {
    fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let service_type = TypeKey::of::<T>();
        self.resolve_service(service_type)?
            .downcast::<T>()
            .map_err(|_| {
                EventsError::consumer_resolution(
                    service_type.to_string(),
                    "registered factory produced a different type",
                )
            })
    }
}

impl<S: DependencyScope + ?Sized> DependencyScopeExt for S {}

/// Opens new, independent dependency scopes
pub trait ScopeFactory: Send + Sync {
    fn create_scope(&self) -> Arc<dyn DependencyScope>;
}

type ServiceFactory = Arc<dyn Fn(&dyn DependencyScope) -> Result<ServiceInstance> + Send + Sync>;

enum ServiceLifetime {
    Singleton(ServiceInstance),
    Scoped(ServiceFactory),
    Transient(ServiceFactory),
}

struct ServiceRegistration {
    service_type: TypeKey,
    lifetime: ServiceLifetime,
}

/// Root service container; clone freely, all clones share registrations
#[derive(Clone)]
pub struct ServiceContainer {
    registrations: Arc<HashMap<TypeId, ServiceRegistration>>,
}

impl ServiceContainer {
    pub fn builder() -> ServiceContainerBuilder {
        ServiceContainerBuilder::default()
    }

    /// Open a new scope over this container
    pub fn begin_scope(&self) -> ServiceScope {
        ServiceScope {
            id: Uuid::new_v4(),
            registrations: Arc::clone(&self.registrations),
            scoped: DashMap::new(),
        }
    }

    pub fn is_registered(&self, service_type: TypeKey) -> bool {
        self.registrations.contains_key(&service_type.id())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl ScopeFactory for ServiceContainer {
    fn create_scope(&self) -> Arc<dyn DependencyScope> {
        Arc::new(self.begin_scope())
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut services: Vec<String> = self
            .registrations
            .values()
            .map(|registration| registration.service_type.to_string())
            .collect();
        services.sort();
        f.debug_struct("ServiceContainer")
            .field("services", &services)
            .finish()
    }
}

/// Builder for [`ServiceContainer`]
#[derive(Default)]
pub struct ServiceContainerBuilder {
    registrations: HashMap<TypeId, ServiceRegistration>,
}

impl ServiceContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared instance
    pub fn add_singleton<T: Send + Sync + 'static>(self, instance: T) -> Self {
        self.add_singleton_arc(Arc::new(instance))
    }

    pub fn add_singleton_arc<T: Send + Sync + 'static>(mut self, instance: Arc<T>) -> Self {
        self.insert::<T>(ServiceLifetime::Singleton(instance));
        self
    }

    /// Register a factory invoked once per scope
    pub fn add_scoped<T, F>(mut self, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&dyn DependencyScope) -> Result<T> + Send + Sync + 'static,
    {
        self.insert::<T>(ServiceLifetime::Scoped(erase(factory)));
        self
    }

    /// Register a factory invoked on every resolution
    pub fn add_transient<T, F>(mut self, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&dyn DependencyScope) -> Result<T> + Send + Sync + 'static,
    {
        self.insert::<T>(ServiceLifetime::Transient(erase(factory)));
        self
    }

    fn insert<T: Send + Sync + 'static>(&mut self, lifetime: ServiceLifetime) {
        let service_type = TypeKey::of::<T>();
        self.registrations.insert(
            service_type.id(),
            ServiceRegistration {
                service_type,
                lifetime,
            },
        );
    }

    pub fn build(self) -> ServiceContainer {
        ServiceContainer {
            registrations: Arc::new(self.registrations),
        }
    }
}

fn erase<T, F>(factory: F) -> ServiceFactory
where
    T: Send + Sync + 'static,
    F: Fn(&dyn DependencyScope) -> Result<T> + Send + Sync + 'static,
{
    Arc::new(move |scope: &dyn DependencyScope| -> Result<ServiceInstance> {
        let instance: ServiceInstance = Arc::new(factory(scope)?);
        Ok(instance)
    })
}

/// One unit of work over a [`ServiceContainer`]
pub struct ServiceScope {
    id: Uuid,
    registrations: Arc<HashMap<TypeId, ServiceRegistration>>,
    scoped: DashMap<TypeId, ServiceInstance>,
}

impl ServiceScope {
    /// Number of scoped instances created so far
    pub fn scoped_instance_count(&self) -> usize {
        self.scoped.len()
    }
}

impl DependencyScope for ServiceScope {
    fn resolve_service(&self, service_type: TypeKey) -> Result<ServiceInstance> {
        let registration = self
            .registrations
            .get(&service_type.id())
            .ok_or_else(|| EventsError::service_not_registered(service_type.to_string()))?;

        match &registration.lifetime {
            ServiceLifetime::Singleton(instance) => Ok(Arc::clone(instance)),
            ServiceLifetime::Transient(factory) => factory(self),
            ServiceLifetime::Scoped(factory) => {
                if let Some(existing) = self.scoped.get(&service_type.id()) {
                    return Ok(Arc::clone(existing.value()));
                }

                // Built outside the map lock so the factory may resolve other scoped services
                let created = factory(self)?;
                let instance = self
                    .scoped
                    .entry(service_type.id())
                    .or_insert(created);
                Ok(Arc::clone(instance.value()))
            }
        }
    }

    fn scope_id(&self) -> Uuid {
        self.id
    }
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        debug!(
            scope_id = %self.id,
            scoped_instances = self.scoped.len(),
            "Disposing dependency scope"
        );
    }
}

impl std::fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceScope")
            .field("id", &self.id)
            .field("scoped_instances", &self.scoped.len())
            .finish()
    }
}
