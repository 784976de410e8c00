//! # Consumer Resolution
//!
//! Turns a [`ConsumerDescriptor`] into a live consumer instance plus the extra
//! arguments its method declared, using a [`DependencyScope`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::{EventsError, HandlerError, Result};
use crate::registry::{ConsumerDescriptor, ConsumerInstance, ParameterDescriptor, ParameterKind};

use super::lifetime::ApplicationLifetime;
use super::scope::{DependencyScope, ServiceInstance};

/// One resolved extra parameter
#[derive(Clone)]
pub enum Argument {
    Cancellation(CancellationToken),
    Service(ServiceInstance),
}

impl std::fmt::Debug for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancellation(token) => f
                .debug_tuple("Cancellation")
                .field(&token.is_cancelled())
                .finish(),
            Self::Service(_) => f.write_str("Service(..)"),
        }
    }
}

/// Resolved extra parameters, in declared order
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Argument>,
}

impl Arguments {
    pub fn new(values: Vec<Argument>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Argument> {
        self.values.get(position)
    }

    /// The shutdown token declared at `position`
    pub fn cancellation(&self, position: usize) -> std::result::Result<CancellationToken, HandlerError> {
        match self.values.get(position) {
            Some(Argument::Cancellation(token)) => Ok(token.clone()),
            _ => Err(parameter_type_error(position, "cancellation token")),
        }
    }

    /// The service of type `T` declared at `position`
    pub fn service<T: Send + Sync + 'static>(
        &self,
        position: usize,
    ) -> std::result::Result<Arc<T>, HandlerError> {
        match self.values.get(position) {
            Some(Argument::Service(instance)) => Arc::clone(instance)
                .downcast::<T>()
                .map_err(|_| parameter_type_error(position, std::any::type_name::<T>())),
            _ => Err(parameter_type_error(position, std::any::type_name::<T>())),
        }
    }
}

fn parameter_type_error(position: usize, expected: &str) -> HandlerError {
    HandlerError::new(EventsError::ParameterType {
        position,
        expected: expected.to_string(),
    })
}

/// Produces consumer instances and method arguments
pub trait ConsumerResolver: Send + Sync {
    /// Obtain an instance of the descriptor's consumer type from `scope`
    fn resolve(
        &self,
        descriptor: &ConsumerDescriptor,
        scope: &dyn DependencyScope,
    ) -> Result<ConsumerInstance>;

    /// Obtain the value for one extra parameter
    ///
    /// Cancellation parameters resolve without a scope; services need one.
    fn resolve_parameter(
        &self,
        descriptor: &ConsumerDescriptor,
        parameter: &ParameterDescriptor,
        scope: Option<&dyn DependencyScope>,
    ) -> Result<Argument>;

    /// Resolve every extra parameter in declared order
    fn resolve_arguments(
        &self,
        descriptor: &ConsumerDescriptor,
        scope: &dyn DependencyScope,
    ) -> Result<Arguments> {
        descriptor
            .parameters()
            .iter()
            .map(|parameter| self.resolve_parameter(descriptor, parameter, Some(scope)))
            .collect::<Result<Vec<_>>>()
            .map(Arguments::new)
    }
}

/// Resolver backed by the dependency scope and the application lifetime
#[derive(Debug, Clone)]
pub struct DefaultConsumerResolver {
    lifetime: ApplicationLifetime,
}

impl DefaultConsumerResolver {
    pub fn new(lifetime: ApplicationLifetime) -> Self {
        Self { lifetime }
    }

    pub fn lifetime(&self) -> &ApplicationLifetime {
        &self.lifetime
    }
}

impl ConsumerResolver for DefaultConsumerResolver {
    fn resolve(
        &self,
        descriptor: &ConsumerDescriptor,
        scope: &dyn DependencyScope,
    ) -> Result<ConsumerInstance> {
        let container_type = descriptor.container_type();
        trace!(
            consumer = %container_type,
            scope_id = %scope.scope_id(),
            "Resolving consumer"
        );

        scope
            .resolve_service(container_type)
            .map_err(|error| match error {
                EventsError::ServiceNotRegistered { .. } => EventsError::consumer_resolution(
                    container_type.to_string(),
                    "consumer type is not registered in the service container",
                ),
                other => other,
            })
    }

    fn resolve_parameter(
        &self,
        descriptor: &ConsumerDescriptor,
        parameter: &ParameterDescriptor,
        scope: Option<&dyn DependencyScope>,
    ) -> Result<Argument> {
        match parameter.kind() {
            ParameterKind::Cancellation => {
                Ok(Argument::Cancellation(self.lifetime.application_stopping()))
            }
            ParameterKind::Primitive => Err(EventsError::PrimitiveParameter {
                consumer: descriptor.identity(),
                parameter: parameter.name().to_string(),
                type_name: parameter.parameter_type().to_string(),
            }),
            ParameterKind::Message => Err(EventsError::consumer_resolution(
                descriptor.container_type().to_string(),
                format!(
                    "parameter '{}' is the message and is not resolved from a scope",
                    parameter.name()
                ),
            )),
            ParameterKind::Service => {
                let scope = scope.ok_or_else(|| {
                    EventsError::consumer_resolution(
                        descriptor.container_type().to_string(),
                        format!("no dependency scope available for parameter '{}'", parameter.name()),
                    )
                })?;
                scope
                    .resolve_service(parameter.parameter_type())
                    .map(Argument::Service)
            }
        }
    }
}
