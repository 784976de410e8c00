//! # System Constants
//!
//! Naming conventions and environment keys shared across the event system.

/// Accepted consumer method names
///
/// Synchronous methods use the bare names; asynchronous methods carry the
/// `Async` suffix.
pub mod method_names {
    pub const HANDLE: &str = "Handle";
    pub const HANDLE_EVENT: &str = "HandleEvent";
    pub const CONSUME: &str = "Consume";

    pub const HANDLE_ASYNC: &str = "HandleAsync";
    pub const HANDLE_EVENT_ASYNC: &str = "HandleEventAsync";
    pub const CONSUME_ASYNC: &str = "ConsumeAsync";

    pub const SYNC: [&str; 3] = [HANDLE, HANDLE_EVENT, CONSUME];
    pub const ASYNC: [&str; 3] = [HANDLE_ASYNC, HANDLE_EVENT_ASYNC, CONSUME_ASYNC];

    /// Whether `name` is valid for a method of the given shape
    pub fn is_accepted(name: &str, is_async: bool) -> bool {
        if is_async {
            ASYNC.contains(&name)
        } else {
            SYNC.contains(&name)
        }
    }
}

/// Environment variables read at startup
pub mod env {
    /// Primary environment selector
    pub const STOREFRONT_ENV: &str = "STOREFRONT_ENV";
    /// Fallback environment selector
    pub const APP_ENV: &str = "APP_ENV";
    /// Prefix for configuration overrides, e.g. `STOREFRONT_EVENTS__ENABLED=false`
    pub const CONFIG_PREFIX: &str = "STOREFRONT_EVENTS";
    /// Separator between nested configuration keys in override variables
    pub const CONFIG_SEPARATOR: &str = "__";
}

pub mod defaults {
    pub const ENVIRONMENT: &str = "development";
    pub const CONFIG_DIRECTORY: &str = "config";
    pub const CONFIG_FILE_STEM: &str = "events";
}
