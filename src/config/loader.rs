//! Configuration Loader
//!
//! Environment-aware loading of [`EventsConfig`]. Sources are layered in order,
//! later ones overriding earlier ones:
//!
//! 1. `{config_dir}/events.toml`
//! 2. `{config_dir}/events.{environment}.toml`
//! 3. `STOREFRONT_EVENTS__*` environment variables (e.g. `STOREFRONT_EVENTS__LOGGING__JSON=true`)
//!
//! Missing files are skipped, so an empty directory yields the defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{Config, Environment, File};
use tracing::{debug, info};

use super::EventsConfig;
use crate::constants::{defaults, env};
use crate::error::Result;

/// Loaded configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: EventsConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> Result<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> Result<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<Arc<ConfigManager>> {
        Self::load_with_variables(config_dir, environment, None)
    }

    /// Load with an explicit set of override variables instead of the process environment
    ///
    /// Useful for testing without modifying global environment variables.
    pub fn load_with_variables(
        config_dir: Option<PathBuf>,
        environment: &str,
        variables: Option<HashMap<String, String>>,
    ) -> Result<Arc<ConfigManager>> {
        let config_directory =
            config_dir.unwrap_or_else(|| PathBuf::from(defaults::CONFIG_DIRECTORY));

        debug!(
            environment = %environment,
            config_directory = %config_directory.display(),
            "Loading event system configuration"
        );

        let base_file = config_directory.join(format!("{}.toml", defaults::CONFIG_FILE_STEM));
        let environment_file = Self::environment_file(&config_directory, environment);

        let config: EventsConfig = Config::builder()
            .add_source(File::from(base_file).required(false))
            .add_source(File::from(environment_file).required(false))
            .add_source(
                Environment::with_prefix(env::CONFIG_PREFIX)
                    .separator(env::CONFIG_SEPARATOR)
                    .try_parsing(true)
                    .source(variables),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;

        info!(
            environment = %environment,
            enabled = config.enabled,
            detached_concurrency_limit = config.detached_concurrency_limit,
            "Event system configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration
    pub fn from_config(config: EventsConfig, environment: impl Into<String>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            environment: environment.into(),
            config_directory: PathBuf::from(defaults::CONFIG_DIRECTORY),
        })
    }

    pub fn config(&self) -> &EventsConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Current environment from `STOREFRONT_ENV`, then `APP_ENV`, else `development`
    pub fn detect_environment() -> String {
        environment_from(|name| std::env::var(name).ok())
    }

    fn environment_file(config_directory: &Path, environment: &str) -> PathBuf {
        config_directory.join(format!("{}.{}.toml", defaults::CONFIG_FILE_STEM, environment))
    }
}

pub(crate) fn environment_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    [env::STOREFRONT_ENV, env::APP_ENV]
        .into_iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| defaults::ENVIRONMENT.to_string())
}
