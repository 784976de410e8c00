//! # Structured Logging Module
//!
//! Environment-aware `tracing` subscriber setup, plus the error logger the
//! invoker reports consumer failures through.

use std::error::Error as StdError;
use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::loader::environment_from;
use crate::config::LoggingConfig;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific defaults
pub fn init_structured_logging() {
    init_structured_logging_with(&LoggingConfig::default());
}

/// Initialize structured logging from configuration
///
/// `RUST_LOG`, when set, wins over the configured level. Only the first call
/// has any effect.
pub fn init_structured_logging_with(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = environment_from(|name| std::env::var(name).ok());
        let level = config
            .level
            .clone()
            .unwrap_or_else(|| default_log_level(&environment).to_string());
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

        let json_layer = config.json.then(|| {
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
        });
        let text_layer = (!config.json).then(|| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
        });

        // Another subscriber (e.g. from a test harness) may already be installed
        if tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .with(text_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            level = %level,
            json = config.json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Default filter directive for an environment
fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        "test" => "warn",
        _ => "debug",
    }
}

/// Sink for consumer failures reported by the invoker
pub trait ConsumerErrorLogger: Send + Sync {
    /// Record one failure; `description` identifies the consumer
    fn error(&self, description: &str, error: Option<&(dyn StdError + 'static)>);
}

/// Reports consumer failures as `tracing` error events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorLogger;

impl ConsumerErrorLogger for TracingErrorLogger {
    fn error(&self, description: &str, error: Option<&(dyn StdError + 'static)>) {
        match error {
            Some(error) => tracing::error!(
                consumer = %description,
                error = %error,
                error_chain = %error_chain(error),
                "❌ CONSUMER_ERROR"
            ),
            None => tracing::error!(consumer = %description, "❌ CONSUMER_ERROR"),
        }
    }
}

/// Discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NullErrorLogger;

impl ConsumerErrorLogger for NullErrorLogger {
    fn error(&self, _description: &str, _error: Option<&(dyn StdError + 'static)>) {}
}

/// `outer: inner: root` rendering of an error and its sources
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
