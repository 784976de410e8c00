//! # Event Dispatch Error Types
//!
//! Two layers of errors flow through the dispatcher:
//!
//! - [`HandlerError`] is what a consumer method returns. It may wrap a single
//!   failure, aggregate several, or record a captured panic.
//! - [`EventsError`] is what the registry, resolver, invoker and publisher
//!   return to their callers.

use std::any::Any;
use std::error::Error as StdError;

use thiserror::Error;

/// Boxed error type accepted from consumer code
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result returned by every consumer method
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Failure raised by (or surfaced through) a consumer method
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(BoxError),

    #[error("{} consumer errors occurred", .0.len())]
    Aggregate(Vec<HandlerError>),

    #[error("consumer panicked: {message}")]
    Panicked { message: String },
}

impl HandlerError {
    /// Wrap any error (or string) as a handler failure
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self::Failed(error.into())
    }

    /// Bundle several failures into one composite error
    pub fn aggregate(errors: impl IntoIterator<Item = HandlerError>) -> Self {
        Self::Aggregate(errors.into_iter().collect())
    }

    /// Build a handler error from a captured panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked { message }
    }

    /// Whether this error is a composite of several inner failures
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate(_))
    }

    /// Inner failures of a composite error; empty for single failures
    pub fn inner_errors(&self) -> &[HandlerError] {
        match self {
            Self::Aggregate(errors) => errors,
            _ => &[],
        }
    }

    /// Downcast the wrapped error of a single failure
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Failed(error) => error.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(error: anyhow::Error) -> Self {
        Self::Failed(error.into())
    }
}

impl From<tokio::task::JoinError> for HandlerError {
    fn from(error: tokio::task::JoinError) -> Self {
        if error.is_panic() {
            Self::from_panic(error.into_panic())
        } else {
            Self::Failed(Box::new(error))
        }
    }
}

/// Errors produced by the dispatch pipeline
#[derive(Error, Debug)]
pub enum EventsError {
    #[error("Failed to resolve consumer {container_type}: {reason}")]
    ConsumerResolution {
        container_type: String,
        reason: String,
    },

    #[error("No service registered for type {type_name}")]
    ServiceNotRegistered { type_name: String },

    #[error("Parameter '{parameter}' of {consumer} has primitive type {type_name} and cannot be resolved")]
    PrimitiveParameter {
        consumer: String,
        parameter: String,
        type_name: String,
    },

    #[error("Parameter at position {position} is not a {expected}")]
    ParameterType { position: usize, expected: String },

    #[error("Consumer {consumer} expects {expected} but the envelope carries {actual}")]
    MessageTypeMismatch {
        consumer: String,
        expected: String,
        actual: String,
    },

    #[error("Consumer {consumer} failed: {source}")]
    Handler {
        consumer: String,
        #[source]
        source: HandlerError,
    },

    #[error("Invalid consumer registration {consumer}: {reason}")]
    InvalidRegistration { consumer: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EventsError {
    /// Create a consumer resolution error
    pub fn consumer_resolution(container_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConsumerResolution {
            container_type: container_type.into(),
            reason: reason.into(),
        }
    }

    /// Create an error for an unregistered service type
    pub fn service_not_registered(type_name: impl Into<String>) -> Self {
        Self::ServiceNotRegistered {
            type_name: type_name.into(),
        }
    }

    /// Create an invalid registration error
    pub fn invalid_registration(consumer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRegistration {
            consumer: consumer.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from resolving a consumer or one of its parameters
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::ConsumerResolution { .. }
                | Self::ServiceNotRegistered { .. }
                | Self::PrimitiveParameter { .. }
        )
    }

    /// The consumer failure carried by this error, if any
    pub fn handler_error(&self) -> Option<&HandlerError> {
        match self {
            Self::Handler { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for EventsError {
    fn from(error: config::ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EventsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("invalid operation: {0}")]
    struct InvalidOperation(String);

    #[test]
    fn test_handler_error_downcast() {
        let error = HandlerError::new(InvalidOperation("bad".to_string()));
        let inner = error.downcast_ref::<InvalidOperation>().unwrap();
        assert_eq!(inner.0, "bad");
        assert!(!error.is_aggregate());
        assert!(error.inner_errors().is_empty());
    }

    #[test]
    fn test_aggregate_exposes_inner_errors() {
        let error = HandlerError::aggregate(vec![
            HandlerError::new("first"),
            HandlerError::new("second"),
        ]);
        assert!(error.is_aggregate());
        assert_eq!(error.inner_errors().len(), 2);
        assert_eq!(error.to_string(), "2 consumer errors occurred");
    }

    #[test]
    fn test_panic_payload_conversion() {
        let error = HandlerError::from_panic(Box::new("boom"));
        assert_eq!(error.to_string(), "consumer panicked: boom");

        let error = HandlerError::from_panic(Box::new(String::from("owned boom")));
        assert_eq!(error.to_string(), "consumer panicked: owned boom");
    }

    #[test]
    fn test_resolution_failure_classification() {
        assert!(EventsError::service_not_registered("Mailer").is_resolution_failure());
        assert!(!EventsError::Configuration("x".to_string()).is_resolution_failure());

        let error = EventsError::Handler {
            consumer: "OrderConsumer.Handle(OrderPlaced)".to_string(),
            source: HandlerError::new("bad"),
        };
        assert!(error.handler_error().is_some());
        assert!(!error.is_resolution_failure());
    }
}
