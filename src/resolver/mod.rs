//! # Consumer and Dependency Resolution
//!
//! ```text
//! Resolver Infrastructure
//! ├── ServiceContainer / ServiceScope  (singleton, scoped, transient services)
//! ├── ApplicationLifetime              (shutdown cancellation token)
//! └── DefaultConsumerResolver          (descriptor + scope -> consumer, arguments)
//! ```

pub mod consumer_resolver;
pub mod lifetime;
pub mod scope;

pub use consumer_resolver::{Argument, Arguments, ConsumerResolver, DefaultConsumerResolver};
pub use lifetime::ApplicationLifetime;
pub use scope::{
    DependencyScope, DependencyScopeExt, ScopeFactory, ServiceContainer, ServiceContainerBuilder,
    ServiceInstance, ServiceScope,
};
