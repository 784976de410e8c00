//! # Event System Configuration
//!
//! Environment-aware settings for the dispatcher. Values come from TOML files
//! with environment-specific overrides and `STOREFRONT_EVENTS__*` variables on top.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use storefront_events::config::ConfigManager;
//!
//! # fn main() -> Result<(), storefront_events::EventsError> {
//! let manager = ConfigManager::load()?;
//! let limit = manager.config().detached_limit();
//! # Ok(())
//! # }
//! ```
//!
//! ## File Layout
//!
//! ```text
//! config/
//! ├── events.toml              (base settings)
//! └── events.production.toml   (per-environment overrides)
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

use crate::error::{EventsError, Result};

pub use loader::ConfigManager;

/// Dispatcher settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// When false, publishing goes to a no-op publisher
    pub enabled: bool,
    /// When false, consumer failures are not logged (propagation is unchanged)
    pub log_consumer_errors: bool,
    /// Maximum concurrently running detached consumers; 0 means unlimited
    pub detached_concurrency_limit: usize,
    pub logging: LoggingConfig,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_consumer_errors: true,
            detached_concurrency_limit: 0,
            logging: LoggingConfig::default(),
        }
    }
}

impl EventsConfig {
    /// Detached concurrency limit, `None` when unlimited
    pub fn detached_limit(&self) -> Option<usize> {
        (self.detached_concurrency_limit > 0).then_some(self.detached_concurrency_limit)
    }

    pub fn validate(&self) -> Result<()> {
        if self.detached_concurrency_limit > Semaphore::MAX_PERMITS {
            return Err(EventsError::Configuration(format!(
                "detached_concurrency_limit {} exceeds maximum of {}",
                self.detached_concurrency_limit,
                Semaphore::MAX_PERMITS
            )));
        }

        self.logging.validate()
    }
}

/// Subscriber settings used by [`init_structured_logging_with`](crate::logging::init_structured_logging_with)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; the environment default applies when unset
    pub level: Option<String>,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        match &self.level {
            Some(level) if level.trim().is_empty() => Err(EventsError::Configuration(
                "logging.level must not be empty".to_string(),
            )),
            Some(level) => EnvFilter::try_new(level).map(|_| ()).map_err(|error| {
                EventsError::Configuration(format!("invalid logging.level '{level}': {error}"))
            }),
            None => Ok(()),
        }
    }
}
