//! # Consumer Descriptors
//!
//! A [`ConsumerDescriptor`] is the compiled metadata for one consumer binding:
//! which message type it accepts, which consumer type declares it, the erased
//! method to call and the flags that pick one of the four execution modes.
//! Descriptors are built once through
//! [`ConsumerRegistration`](super::registration::ConsumerRegistration) and are
//! immutable afterwards.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::{HandlerResult, Result};
use crate::events::{EnvelopeHeader, MessageView, TypeKey};
use crate::resolver::Arguments;

/// Marker for types that declare consumer methods
pub trait Consumer: Any + Send + Sync {}

/// A resolved consumer, erased until its method downcasts it back
pub type ConsumerInstance = Arc<dyn Any + Send + Sync>;

/// Outcome of calling a consumer method
pub enum Invocation {
    /// A synchronous method has already run
    Completed(HandlerResult),
    /// An asynchronous method returned work that still has to be driven
    Pending(BoxFuture<'static, HandlerResult>),
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(result) => f.debug_tuple("Completed").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

impl Invocation {
    /// Drive the invocation to completion on the current task
    pub async fn complete(self) -> HandlerResult {
        match self {
            Self::Completed(result) => result,
            Self::Pending(future) => future.await,
        }
    }
}

/// Type-erased consumer method bound at registration time
pub type ConsumerMethod = Arc<
    dyn Fn(ConsumerInstance, &MessageView, &EnvelopeHeader, Arguments) -> Result<Invocation>
        + Send
        + Sync,
>;

/// The four dispatch policies, selected by `(fire_forget, is_async)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    SyncAwaited,
    AsyncAwaited,
    SyncDetached,
    AsyncDetached,
}

impl ExecutionMode {
    pub fn from_flags(fire_forget: bool, is_async: bool) -> Self {
        match (fire_forget, is_async) {
            (false, false) => Self::SyncAwaited,
            (false, true) => Self::AsyncAwaited,
            (true, false) => Self::SyncDetached,
            (true, true) => Self::AsyncDetached,
        }
    }

    pub fn is_detached(self) -> bool {
        matches!(self, Self::SyncDetached | Self::AsyncDetached)
    }

    pub fn is_async(self) -> bool {
        matches!(self, Self::AsyncAwaited | Self::AsyncDetached)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SyncAwaited => "sync-awaited",
            Self::AsyncAwaited => "async-awaited",
            Self::SyncDetached => "sync-detached",
            Self::AsyncDetached => "async-detached",
        };
        f.write_str(label)
    }
}

/// How a method parameter gets its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// The message itself (or its envelope)
    Message,
    /// The application shutdown token
    Cancellation,
    /// A service resolved from the dependency scope
    Service,
    /// A scalar or string type; never resolvable
    Primitive,
}

/// Metadata for one method parameter
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    position: usize,
    name: &'static str,
    parameter_type: TypeKey,
    kind: ParameterKind,
}

impl ParameterDescriptor {
    pub(crate) fn new(
        position: usize,
        name: &'static str,
        parameter_type: TypeKey,
        kind: ParameterKind,
    ) -> Self {
        Self {
            position,
            name,
            parameter_type,
            kind,
        }
    }

    /// Zero-based position among the extra parameters
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameter_type(&self) -> TypeKey {
        self.parameter_type
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }
}

/// Scalar and string types that a dependency scope never provides
pub(crate) fn is_primitive(type_id: TypeId) -> bool {
    [
        TypeId::of::<bool>(),
        TypeId::of::<char>(),
        TypeId::of::<i8>(),
        TypeId::of::<i16>(),
        TypeId::of::<i32>(),
        TypeId::of::<i64>(),
        TypeId::of::<i128>(),
        TypeId::of::<isize>(),
        TypeId::of::<u8>(),
        TypeId::of::<u16>(),
        TypeId::of::<u32>(),
        TypeId::of::<u64>(),
        TypeId::of::<u128>(),
        TypeId::of::<usize>(),
        TypeId::of::<f32>(),
        TypeId::of::<f64>(),
        TypeId::of::<String>(),
        TypeId::of::<&'static str>(),
    ]
    .contains(&type_id)
}

/// The extension module that contributed a consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub system_name: String,
    pub friendly_name: String,
}

impl PluginDescriptor {
    pub fn new(system_name: impl Into<String>, friendly_name: impl Into<String>) -> Self {
        Self {
            system_name: system_name.into(),
            friendly_name: friendly_name.into(),
        }
    }
}

/// Compiled metadata for one consumer binding
pub struct ConsumerDescriptor {
    pub(crate) message_type: TypeKey,
    pub(crate) container_type: TypeKey,
    pub(crate) method_name: &'static str,
    pub(crate) method: ConsumerMethod,
    pub(crate) message_parameter: ParameterDescriptor,
    pub(crate) parameters: Vec<ParameterDescriptor>,
    pub(crate) with_envelope: bool,
    pub(crate) is_async: bool,
    pub(crate) fire_forget: bool,
    pub(crate) plugin: Option<PluginDescriptor>,
}

impl ConsumerDescriptor {
    pub fn message_type(&self) -> TypeKey {
        self.message_type
    }

    pub fn container_type(&self) -> TypeKey {
        self.container_type
    }

    pub fn method_name(&self) -> &'static str {
        self.method_name
    }

    pub fn method(&self) -> &ConsumerMethod {
        &self.method
    }

    pub fn message_parameter(&self) -> &ParameterDescriptor {
        &self.message_parameter
    }

    /// Extra parameters in declared order, excluding the message
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn with_envelope(&self) -> bool {
        self.with_envelope
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn fire_forget(&self) -> bool {
        self.fire_forget
    }

    pub fn plugin(&self) -> Option<&PluginDescriptor> {
        self.plugin.as_ref()
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::from_flags(self.fire_forget, self.is_async)
    }

    /// `Container.Method(Message)`, used to attribute log entries and errors
    pub fn identity(&self) -> String {
        format!(
            "{}.{}({})",
            self.container_type, self.method_name, self.message_type
        )
    }
}

impl fmt::Debug for ConsumerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerDescriptor")
            .field("message_type", &self.message_type)
            .field("container_type", &self.container_type)
            .field("method_name", &self.method_name)
            .field("parameters", &self.parameters)
            .field("with_envelope", &self.with_envelope)
            .field("is_async", &self.is_async)
            .field("fire_forget", &self.fire_forget)
            .field("plugin", &self.plugin)
            .finish()
    }
}
