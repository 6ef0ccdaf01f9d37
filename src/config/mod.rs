//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (Config, NetworkConfig, PluginsConfig, EventsConfig)
//! - [`defaults`]: serde default value functions
//! - [`validation`]: startup validation returning every problem found

mod defaults;
mod types;
mod validation;

pub use types::{CacheBackend, Config, ConfigError, EventsConfig, NetworkConfig, PluginsConfig};
pub use validation::{ValidationError, validate};
